//! Array geometry model (spec §3) and geometry-file parsing (spec §6.2).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One member image: a (possibly partial) raw byte image of one physical
/// disk, covering `[start, end)` of that member's logical byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberImage {
    pub id: String,
    pub raid_index: u32,
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
}

impl MemberImage {
    fn contains(&self, byte_addr: u64) -> bool {
        self.start <= byte_addr && byte_addr < self.end
    }
}

/// An assembled, validated array geometry: a set of member images sharing
/// one page size and covering exactly `{0, .., n-1}` member indices.
#[derive(Debug, Clone)]
pub struct ArrayGeometry {
    pub page_size: u64,
    pub members: Vec<MemberImage>,
    n: usize,
}

impl ArrayGeometry {
    /// Validates and assembles a geometry from a flat list of member images.
    ///
    /// Enforces spec §3's invariants: `page_size` is a positive,
    /// power-of-two multiple of 1 KiB, every image's extent is a positive,
    /// page-aligned multiple of `page_size`, and the raid indices present
    /// form a contiguous `{0, .., n-1}` with `n >= 3`.
    pub fn new(members: Vec<MemberImage>, page_size: u64) -> Result<Self> {
        if page_size == 0 || page_size % 1024 != 0 || !(page_size / 1024).is_power_of_two() {
            return Err(Error::Argument(format!(
                "page size {page_size} bytes is not a positive power-of-two multiple of 1 KiB"
            )));
        }
        if members.is_empty() {
            return Err(Error::Argument("geometry has no member images".into()));
        }
        for m in &members {
            if m.end <= m.start {
                return Err(Error::Argument(format!(
                    "member image {} has empty or negative extent [{}, {})",
                    m.id, m.start, m.end
                )));
            }
            if m.start % page_size != 0 || m.end % page_size != 0 {
                return Err(Error::Argument(format!(
                    "member image {} extent [{}, {}) is not page-aligned to {page_size}",
                    m.id, m.start, m.end
                )));
            }
        }

        let indices: BTreeSet<u32> = members.iter().map(|m| m.raid_index).collect();
        let n = indices.len();
        if n < 3 {
            return Err(Error::Argument(format!(
                "RAID5 requires at least 3 members, geometry covers {n}"
            )));
        }
        let expected: BTreeSet<u32> = (0..n as u32).collect();
        if indices != expected {
            return Err(Error::Argument(format!(
                "member raid indices {indices:?} do not form a contiguous 0..{n} range"
            )));
        }

        Ok(ArrayGeometry { page_size, members, n })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Total logical (reconstructed) device size in bytes: §3's
    /// `Σ extents * (n-1)/n`.
    pub fn logical_size(&self) -> u64 {
        let total_extent: u64 = self.members.iter().map(|m| m.end - m.start).sum();
        total_extent * (self.n as u64 - 1) / self.n as u64
    }

    /// Finds the member image at `raid_index` whose extent covers
    /// `byte_addr` (a page-start address in that member's logical byte
    /// range). Fails with [`Error::GeometryGap`] if none does.
    pub fn find_image(&self, raid_index: u32, byte_addr: u64) -> Result<&MemberImage> {
        self.members
            .iter()
            .find(|m| m.raid_index == raid_index && m.contains(byte_addr))
            .ok_or(Error::GeometryGap {
                raid_index,
                page: byte_addr / self.page_size,
                offset: byte_addr,
            })
    }
}

/// Parses the geometry file format of spec §6.2.
///
/// Each non-blank, non-comment line is
/// `<id> <raid_index> <path> <startKB> <endKB>`; `startKB`/`endKB` may be
/// fractional and are multiplied by 1024 and truncated to integer bytes.
pub fn parse_geometry_file(path: &Path) -> Result<Vec<MemberImage>> {
    let text = fs::read_to_string(path)?;
    let mut members = Vec::new();
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::GeometryFile {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: format!("expected 5 fields, got {}", fields.len()),
            });
        }
        let [id, raid_index, member_path, start_kb, end_kb] = [
            fields[0], fields[1], fields[2], fields[3], fields[4],
        ];

        let raid_index: u32 = raid_index.parse().map_err(|_| Error::GeometryFile {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: format!("raid index '{raid_index}' is not a non-negative integer"),
        })?;
        let start_kb: f64 = start_kb.parse().map_err(|_| Error::GeometryFile {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: format!("startKB '{start_kb}' is not numeric"),
        })?;
        let end_kb: f64 = end_kb.parse().map_err(|_| Error::GeometryFile {
            path: path.to_path_buf(),
            line: line_no + 1,
            message: format!("endKB '{end_kb}' is not numeric"),
        })?;

        if let Some(prev_line) = seen_ids.insert(id.to_string(), line_no + 1) {
            return Err(Error::GeometryFile {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: format!("id '{id}' already used on line {prev_line}"),
            });
        }

        members.push(MemberImage {
            id: id.to_string(),
            raid_index,
            path: PathBuf::from(member_path),
            start: (start_kb * 1024.0) as u64,
            end: (end_kb * 1024.0) as u64,
        });
    }

    if members.is_empty() {
        return Err(Error::GeometryFile {
            path: path.to_path_buf(),
            line: 0,
            message: "no member image records found".into(),
        });
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn member(id: &str, raid_index: u32, start: u64, end: u64) -> MemberImage {
        MemberImage {
            id: id.into(),
            raid_index,
            path: PathBuf::from(format!("/dev/null/{id}")),
            start,
            end,
        }
    }

    #[test]
    fn builds_valid_geometry() {
        let members = vec![
            member("a", 0, 0, 1024),
            member("b", 1, 0, 1024),
            member("c", 2, 0, 1024),
        ];
        let geo = ArrayGeometry::new(members, 1024).unwrap();
        assert_eq!(geo.n(), 3);
        assert_eq!(geo.logical_size(), (3072 * 2) / 3);
    }

    #[test]
    fn rejects_gap_in_member_indices() {
        let members = vec![member("a", 0, 0, 1024), member("b", 2, 0, 1024), member("c", 3, 0, 1024)];
        assert!(ArrayGeometry::new(members, 1024).is_err());
    }

    #[test]
    fn rejects_non_page_aligned_extent() {
        let members = vec![member("a", 0, 0, 1000), member("b", 1, 0, 1024), member("c", 2, 0, 1024)];
        assert!(ArrayGeometry::new(members, 1024).is_err());
    }

    #[test]
    fn find_image_locates_owning_extent() {
        let members = vec![
            member("a0", 0, 0, 1024),
            member("a1", 0, 1024, 2048),
            member("b", 1, 0, 2048),
            member("c", 2, 0, 2048),
        ];
        let geo = ArrayGeometry::new(members, 1024).unwrap();
        assert_eq!(geo.find_image(0, 1024).unwrap().id, "a1");
        assert!(geo.find_image(0, 3000).is_err());
    }

    #[test]
    fn parses_geometry_file_with_comments_and_blank_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "# a comment").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "m0 0 /images/m0.img 0 1024").unwrap();
        writeln!(f, "m1 1 /images/m1.img 0.0 1024.0").unwrap();
        writeln!(f, "m2 2 /images/m2.img 0 1024").unwrap();
        let members = parse_geometry_file(f.path()).unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].start, 0);
        assert_eq!(members[1].end, 1024 * 1024);
    }

    #[test]
    fn rejects_malformed_line() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "m0 0 /images/m0.img 0").unwrap();
        assert!(parse_geometry_file(f.path()).is_err());
    }
}
