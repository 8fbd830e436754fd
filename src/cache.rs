//! Cache of prepared result codecs
//!
//! Resolving a type tag to its wire behaviour is done once per tag and the
//! prepared [`ResultCodec`] is reused from then on. The cache is an explicit
//! object: library entry points use the process-wide [`CodecCache::shared`]
//! instance, and callers that want an isolated lifecycle can own their own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::error::Result;
use crate::item::{Item, TypeTag};
use crate::xml::Element;

/// Prepared encoder/decoder pair for one observation result type
///
/// Immutable once constructed; a single instance may be used concurrently
/// from any number of threads.
#[derive(Debug)]
pub struct ResultCodec {
    tag: TypeTag,
    uri: &'static str,
}

impl ResultCodec {
    fn prepare(tag: TypeTag) -> Self {
        Self {
            tag,
            uri: tag.uri(),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    /// The observation type URI written to the wire for this codec
    pub fn uri(&self) -> &'static str {
        self.uri
    }

    /// Encode an item into the top-level result slot
    pub fn encode(&self, item: &Item, id_prefix: &str) -> Result<Element> {
        item.encode_as_result(id_prefix)
    }

    /// Decode the top-level result slot into an item of this type
    pub fn decode(&self, result: &Element) -> Result<Item> {
        Item::decode_result(self.tag, result)
    }
}

/// Lazily-populated mapping from type tags to prepared codecs
///
/// Lookup is check-then-insert under one mutex; the returned `Arc` is held
/// without the lock. The shared instance lives for the whole process and is
/// initialised on first use.
#[derive(Debug, Default)]
pub struct CodecCache {
    codecs: Mutex<HashMap<TypeTag, Arc<ResultCodec>>>,
}

impl CodecCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the library entry points
    pub fn shared() -> &'static CodecCache {
        static SHARED: OnceLock<CodecCache> = OnceLock::new();
        SHARED.get_or_init(CodecCache::new)
    }

    /// The codec for a type tag, building and caching it on first use
    pub fn codec_for(&self, tag: TypeTag) -> Arc<ResultCodec> {
        let mut codecs = match self.codecs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        codecs
            .entry(tag)
            .or_insert_with(|| Arc::new(ResultCodec::prepare(tag)))
            .clone()
    }

    /// Number of codecs built so far
    pub fn len(&self) -> usize {
        match self.codecs.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_is_cached() {
        let cache = CodecCache::new();
        assert!(cache.is_empty());
        let first = cache.codec_for(TypeTag::Measurement);
        let second = cache.codec_for(TypeTag::Measurement);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.uri(), TypeTag::Measurement.uri());
    }

    #[test]
    fn test_cached_codec_usable_across_threads() {
        let cache = CodecCache::new();
        let codec = cache.codec_for(TypeTag::Truth);
        let handle = std::thread::spawn({
            let codec = Arc::clone(&codec);
            move || {
                let element = codec.encode(&Item::Boolean(true), "T").unwrap();
                codec.decode(&element).unwrap()
            }
        });
        assert_eq!(handle.join().unwrap(), Item::Boolean(true));
        assert_eq!(
            codec.decode(&codec.encode(&Item::Boolean(false), "T").unwrap()).unwrap(),
            Item::Boolean(false)
        );
    }

    #[test]
    fn test_shared_instance_is_stable() {
        let a = CodecCache::shared();
        let b = CodecCache::shared();
        assert!(std::ptr::eq(a, b));
    }
}
