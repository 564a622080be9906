//! Serializer Module
//!
//! Pluggable value encoding used by the durable tier and for size accounting.

use std::io;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

// == Serializer Trait ==
/// Encodes values to bytes and back.
pub trait Serializer<V>: Send + Sync {
    fn serialize(&self, value: &V) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<V>;

    /// Encoded size of `value` in bytes.
    fn size_of(&self, value: &V) -> Result<usize> {
        Ok(self.serialize(value)?.len())
    }
}

// == JSON Serializer ==
/// serde_json encoding. The default for every cache.
#[derive(Debug)]
pub struct JsonSerializer<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonSerializer<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for JsonSerializer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Serializer<V> for JsonSerializer<V>
where
    V: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &V) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<V> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn size_of(&self, value: &V) -> Result<usize> {
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, value)?;
        Ok(counter.0)
    }
}

/// Sink that only counts what is written to it.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
