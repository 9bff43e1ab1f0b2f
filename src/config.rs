use serde::Deserialize;

use crate::{
    cache::{Cache, Geometry, IsCache},
    error::{Error, Result},
    replace::{Fifo, Lfu, Lru, Nru, Plru, Srrip},
    sectored::{SectoredCache, DEFAULT_SECTOR_SIZE},
    write_buffer::WriteBuffer,
};

fn default_sector_size() -> usize {
    DEFAULT_SECTOR_SIZE
}

fn default_flush_threshold() -> usize {
    WriteBuffer::DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub repl: String,
    pub size: usize,
    pub block_size: usize,
    pub ways: usize,
    /// Only read by `upgradedLRU`.
    #[serde(default = "default_sector_size")]
    pub sector_size: usize,
    /// Only read by `upgradedLRU`.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

/// Levels in lookup order, L1 first.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub caches: Vec<CacheConfig>,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds every level in order. The first invalid level aborts the whole
    /// hierarchy.
    pub fn to_caches(self) -> Result<Vec<Box<dyn IsCache>>> {
        self.caches
            .into_iter()
            .enumerate()
            .map(|(index, cc)| cc.build(index))
            .collect()
    }
}

impl CacheConfig {
    pub fn new(repl: &str, size: usize, block_size: usize, ways: usize) -> Self {
        CacheConfig {
            name: None,
            repl: repl.to_owned(),
            size,
            block_size,
            ways,
            sector_size: DEFAULT_SECTOR_SIZE,
            flush_threshold: WriteBuffer::DEFAULT_THRESHOLD,
        }
    }

    pub fn build(self, index: usize) -> Result<Box<dyn IsCache>> {
        let geom = Geometry::new(index, self.size, self.block_size, self.ways)?;
        let name = self.name.unwrap_or_else(|| format!("L{}", index + 1));
        let cache: Box<dyn IsCache> = match self.repl.as_str() {
            "lru" => Box::new(Cache::new(name, index, geom, Lru::new())?),
            "plru" => {
                if self.ways > Plru::MAX_WAYS {
                    return Err(Error::TooManyWays {
                        level: index + 1,
                        policy: "plru",
                        max: Plru::MAX_WAYS,
                        ways: self.ways,
                    });
                }
                Box::new(Cache::new(name, index, geom, Plru::new())?)
            }
            "srrip" => Box::new(Cache::new(name, index, geom, Srrip::new())?),
            "nru" => Box::new(Cache::new(name, index, geom, Nru::new())?),
            "lfu" => Box::new(Cache::new(name, index, geom, Lfu::new())?),
            "fifo" => Box::new(Cache::new(name, index, geom, Fifo::new())?),
            SectoredCache::NAME => Box::new(SectoredCache::new(
                name,
                index,
                geom,
                self.sector_size,
                self.flush_threshold,
            )?),
            _ => {
                return Err(Error::UnknownPolicy {
                    level: index + 1,
                    name: self.repl,
                })
            }
        };
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_with_defaults() {
        let config = Config::from_json(
            r#"{"caches": [
                {"repl": "lru", "size": 64, "block_size": 16, "ways": 2},
                {"name": "LLC", "repl": "upgradedLRU", "size": 1024, "block_size": 64, "ways": 4,
                 "sector_size": 32, "flush_threshold": 8}
            ]}"#,
        )
        .unwrap();
        assert_eq!(config.caches[0].sector_size, DEFAULT_SECTOR_SIZE);
        assert_eq!(config.caches[0].flush_threshold, 20);

        let caches = config.to_caches().unwrap();
        assert_eq!(caches[0].name(), "L1");
        assert_eq!(caches[0].policy(), "lru");
        assert_eq!(caches[1].name(), "LLC");
        assert_eq!(caches[1].policy(), "upgradedLRU");
        assert_eq!(caches[1].geometry().n_sets, 4);
    }

    #[test]
    fn every_policy_name_builds() {
        for repl in ["lru", "plru", "srrip", "nru", "lfu", "fifo", "upgradedLRU"] {
            let cache = CacheConfig::new(repl, 256, 16, 4).build(0).unwrap();
            assert_eq!(cache.policy(), repl);
            assert_eq!(cache.make_stats().hits, 0);
        }
    }

    #[test]
    fn unknown_policy_is_fatal() {
        let err = CacheConfig::new("random", 256, 16, 4).build(1).err().unwrap();
        assert!(matches!(err, Error::UnknownPolicy { level: 2, ref name } if name == "random"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn first_bad_level_aborts_construction() {
        let config = Config {
            caches: vec![
                CacheConfig::new("lru", 64, 16, 2),
                CacheConfig::new("lru", 100, 16, 2),
                CacheConfig::new("bogus", 64, 16, 2),
            ],
        };
        assert!(matches!(
            config.to_caches(),
            Err(Error::SizeMismatch { level: 2, .. })
        ));
    }

    #[test]
    fn plru_caps_associativity() {
        let err = CacheConfig::new("plru", 16 * 128, 16, 128).build(0).err().unwrap();
        assert!(matches!(err, Error::TooManyWays { max: 64, .. }));
        assert!(CacheConfig::new("plru", 16 * 64, 16, 64).build(0).is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            Config::from_json(r#"{"caches": [], "block_size": 64}"#),
            Err(Error::Json(_))
        ));
    }
}
