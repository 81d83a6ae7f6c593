//! Snowflake-style identifiers.
//!
//! 64 bits: a 42-bit millisecond timestamp counted from the service epoch,
//! a 10-bit node id, and a 12-bit per-node sequence number.

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const NODE_ID_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;

pub const TIMESTAMP_SHIFT: u32 = NODE_ID_BITS + SEQUENCE_BITS;
pub const NODE_ID_SHIFT: u32 = SEQUENCE_BITS;

pub const NODE_ID_MAX: u16 = (1 << NODE_ID_BITS) - 1;
pub const SEQUENCE_MAX: u16 = (1 << SEQUENCE_BITS) - 1;

/// Reference point the embedded timestamps are counted from.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum TimestampFromDateTimeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp does not fit in {TIMESTAMP_BITS} bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range for creation: {0}")]
pub struct PartOutOfRangeError(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct NodeId(u16);

impl NodeId {
    #[must_use]
    pub fn new(id: u16) -> Option<Self> {
        (id <= NODE_ID_MAX).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct SequenceNumber(u16);

impl SequenceNumber {
    #[must_use]
    pub fn new(sequence: u16) -> Option<Self> {
        (sequence <= SEQUENCE_MAX).then_some(Self(sequence))
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }

    /// The next sequence number, wrapping back to zero after the maximum.
    #[must_use]
    pub fn wrapping_next(self) -> Self {
        Self((self.0 + 1) & SEQUENCE_MAX)
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct Timestamp<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Timestamp<SnowflakeEpoch> {
    #[must_use]
    pub fn new(millis: u64) -> Option<Self> {
        (millis < 1 << TIMESTAMP_BITS).then_some(Self(millis, PhantomData))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn now() -> Result<Self, TimestampFromDateTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        Self::try_from(UtcDateTime::now())
    }
}

impl<SnowflakeEpoch: Epoch> TryFrom<UtcDateTime> for Timestamp<SnowflakeEpoch> {
    type Error = TimestampFromDateTimeError;

    fn try_from(value: UtcDateTime) -> Result<Self, Self::Error> {
        let millis = (value - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(Self::Error::TimeBeforeEpoch);
        }
        let millis_u64 = u64::try_from(millis).map_err(|_| Self::Error::TimestampTooLarge)?;
        Self::new(millis_u64).ok_or(Self::Error::TimestampTooLarge)
    }
}

impl<SnowflakeEpoch: Epoch> From<Timestamp<SnowflakeEpoch>> for UtcDateTime {
    fn from(value: Timestamp<SnowflakeEpoch>) -> Self {
        let millis = i64::try_from(value.0).expect("Timestamp exceeds its bit width");
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        timestamp: Timestamp<SnowflakeEpoch>,
        node_id: NodeId,
        sequence: SequenceNumber,
    ) -> Self {
        let snowflake = timestamp.get() << TIMESTAMP_SHIFT
            | u64::from(node_id.get()) << NODE_ID_SHIFT
            | u64::from(sequence.get());

        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp(self) -> Timestamp<SnowflakeEpoch> {
        Timestamp(self.0 >> TIMESTAMP_SHIFT, PhantomData)
    }

    #[must_use]
    pub fn node_id(self) -> NodeId {
        #[allow(clippy::cast_possible_truncation)]
        NodeId((self.0 >> NODE_ID_SHIFT) as u16 & NODE_ID_MAX)
    }

    #[must_use]
    pub fn sequence(self) -> SequenceNumber {
        #[allow(clippy::cast_possible_truncation)]
        SequenceNumber(self.0 as u16 & SEQUENCE_MAX)
    }

    /// The creation time embedded in the id.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        self.timestamp().into()
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

macro_rules! part_conversions {
    ($name:ident: $repr:ty) => {
        impl TryFrom<$repr> for $name {
            type Error = PartOutOfRangeError;

            fn try_from(value: $repr) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(PartOutOfRangeError(u64::from(value)))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = <$repr as Deserialize<'de>>::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

part_conversions!(NodeId: u16);
part_conversions!(SequenceNumber: u16);

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    node_id: NodeId,
    next_sequence: SequenceNumber,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            next_sequence: SequenceNumber::default(),
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, TimestampFromDateTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_next();

        Ok(Snowflake::from_parts(
            Timestamp::try_from(time)?,
            self.node_id,
            sequence,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, TimestampFromDateTimeError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}
