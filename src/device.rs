//! Block-device callback surface (spec §6.1), consumed by whatever host
//! server actually speaks a block-device protocol to a client — that host
//! is out of scope (spec §1 Non-goals); this module is the interface it
//! needs.
//!
//! Per spec §9's Design Notes, configuration is an explicit object threaded
//! through `open`, not process-wide mutable globals the way the original
//! `nbd_raid5.py` did it.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::geometry::{self, ArrayGeometry};
use crate::page_io;
use crate::translator::{self, PageSource};

/// Mutable configuration accumulated via repeated [`Config::apply`] calls,
/// mirroring the `config(key, value)` entry point of spec §6.1.
#[derive(Debug, Default, Clone)]
pub struct Config {
    geometry_file: Option<PathBuf>,
    page_size_kb: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one `key=value` configuration pair. Unknown keys are ignored
    /// with a warning, per spec §6.1.
    pub fn apply(&mut self, key: &str, value: &str) {
        match key {
            "geometryfile" => self.geometry_file = Some(PathBuf::from(value)),
            "pagesizeKB" => match value.parse() {
                Ok(kb) => self.page_size_kb = Some(kb),
                Err(_) => tracing::warn!(key, value, "pagesizeKB is not a valid integer, ignored"),
            },
            other => tracing::warn!(key = other, value, "ignored unknown configuration key"),
        }
    }
}

/// An open, mounted array: owns one file handle per member image and a
/// validated [`ArrayGeometry`]. Immutable after construction; safe to share
/// across concurrent `pread` calls because every read is positional
/// (spec §9's "seek-and-read vs. positional read" note).
pub struct Mount {
    geometry: ArrayGeometry,
    handles: HashMap<String, File>,
}

impl Mount {
    /// Parses the configured geometry file, opens every member image, and
    /// returns the mounted handle. Rejects a write intent, per spec §6.1.
    pub fn open(config: &Config, read_only: bool) -> Result<Self> {
        if !read_only {
            return Err(Error::Argument("write access is not supported".into()));
        }
        let geometry_file = config
            .geometry_file
            .as_ref()
            .ok_or_else(|| Error::Argument("geometryfile was not configured".into()))?;
        let page_size_kb = config
            .page_size_kb
            .ok_or_else(|| Error::Argument("pagesizeKB was not configured".into()))?;

        let members = geometry::parse_geometry_file(geometry_file)?;
        let geo = ArrayGeometry::new(members, page_size_kb * 1024)?;

        let mut handles = HashMap::with_capacity(geo.members.len());
        for member in &geo.members {
            let file = File::open(&member.path)?;
            handles.insert(member.id.clone(), file);
        }

        tracing::info!(
            members = geo.members.len(),
            n = geo.n(),
            page_size = geo.page_size,
            size = geo.logical_size(),
            "mounted RAID5 array"
        );
        Ok(Mount { geometry: geo, handles })
    }

    /// Logical device size in bytes, per spec §6.1.
    pub fn size(&self) -> u64 {
        self.geometry.logical_size()
    }

    /// Fills `out` with bytes starting at logical byte `offset`, per spec §4.4.
    pub fn pread(&self, out: &mut [u8], offset: u64) -> Result<()> {
        translator::pread(self, &self.geometry, offset, out)
    }
}

impl PageSource for Mount {
    fn read_member_page(&self, raid_index: u32, page_start_byte: u64, page_size: u64) -> Result<Vec<u8>> {
        let image = self.geometry.find_image(raid_index, page_start_byte)?;
        let file = self.handles.get(&image.id).ok_or(Error::GeometryGap {
            raid_index,
            page: page_start_byte / page_size,
            offset: page_start_byte,
        })?;
        let local_page_index = (page_start_byte - image.start) / page_size;
        page_io::read_page(file, &image.path, page_size, local_page_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_accumulates_known_keys_and_ignores_others() {
        let mut cfg = Config::new();
        cfg.apply("geometryfile", "/tmp/geometry.txt");
        cfg.apply("pagesizeKB", "256");
        cfg.apply("somethingelse", "ignored");
        assert_eq!(cfg.geometry_file, Some(PathBuf::from("/tmp/geometry.txt")));
        assert_eq!(cfg.page_size_kb, Some(256));
    }

    #[test]
    fn open_rejects_write_intent() {
        let cfg = Config::new();
        assert!(matches!(Mount::open(&cfg, false), Err(Error::Argument(_))));
    }

    #[test]
    fn open_requires_geometry_and_page_size() {
        let cfg = Config::new();
        assert!(Mount::open(&cfg, true).is_err());
    }

    #[test]
    fn open_mounts_and_serves_a_read() {
        let dir = tempfile::tempdir().unwrap();
        let page_size = 1024usize; // 1 KiB, the smallest legal page size
        let members = [
            (0u32, vec![b'A'; page_size]),
            (1u32, vec![b'B'; page_size]),
            (2u32, {
                let mut p = vec![b'A'; page_size];
                for b in p.iter_mut() {
                    *b ^= b'B';
                }
                p
            }),
        ];
        let mut geometry_lines = String::new();
        for (idx, bytes) in &members {
            let path = dir.path().join(format!("m{idx}.img"));
            std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
            geometry_lines.push_str(&format!("m{idx} {idx} {} 0 1\n", path.display()));
        }
        let geometry_path = dir.path().join("geometry.txt");
        std::fs::write(&geometry_path, geometry_lines).unwrap();

        let mut cfg = Config::new();
        cfg.apply("geometryfile", geometry_path.to_str().unwrap());
        cfg.apply("pagesizeKB", "1");

        let mount = Mount::open(&cfg, true).unwrap();
        assert_eq!(mount.size(), (page_size as u64) * 2);

        let mut out = vec![0u8; page_size * 2];
        mount.pread(&mut out, 0).unwrap();
        assert_eq!(&out[..page_size], &vec![b'A'; page_size][..]);
        assert_eq!(&out[page_size..], &vec![b'B'; page_size][..]);
    }
}
