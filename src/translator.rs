//! Block translator (spec §4.4): `pread(offset, len)` split across logical
//! stripe pages, member reads, and head/tail trimming.

use crate::error::{Error, Result};
use crate::geometry::ArrayGeometry;
use crate::stripe;

/// Supplies one member's page bytes to the translator. Implemented by
/// [`crate::device::Mount`] for real files; a plain in-memory fixture can
/// implement it too, which is what makes the translator testable without
/// touching the filesystem.
pub trait PageSource {
    /// Returns the `page_size`-byte page of member `raid_index` starting at
    /// logical byte address `page_start_byte` within that member's extent.
    fn read_member_page(&self, raid_index: u32, page_start_byte: u64, page_size: u64) -> Result<Vec<u8>>;
}

/// Fills `out` with `out.len()` bytes of the reconstructed logical volume
/// starting at `logical_offset`, per spec §4.4.
pub fn pread<S: PageSource>(
    source: &S,
    geometry: &ArrayGeometry,
    logical_offset: u64,
    out: &mut [u8],
) -> Result<()> {
    if out.is_empty() {
        return Err(Error::BadShape("pread requires a non-empty buffer".into()));
    }

    let n = geometry.n();
    let page_size = geometry.page_size;
    let stripe_bytes = page_size * (n as u64 - 1);

    let len = out.len() as u64;
    let first_stripe = logical_offset / stripe_bytes;
    let last_stripe = (logical_offset + len - 1) / stripe_bytes;
    let mut head_skip = logical_offset % stripe_bytes;

    let mut written = 0usize;
    for s in first_stripe..=last_stripe {
        let slots = stripe::stripe_map(n, s);
        let order = stripe::data_column_order(&slots);

        let page_start_byte = s * page_size;
        let mut stripe_buf = Vec::with_capacity(stripe_bytes as usize);
        for column in order {
            let page = source.read_member_page(column as u32, page_start_byte, page_size)?;
            stripe_buf.extend_from_slice(&page);
        }

        let slice = &stripe_buf[head_skip as usize..];
        let remaining = out.len() - written;
        let take = slice.len().min(remaining);
        out[written..written + take].copy_from_slice(&slice[..take]);
        written += take;
        head_skip = 0;

        if written == out.len() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory RAID5 fixture: synthesizes data `D`, stripes it across `n`
    /// members with XOR parity per [`stripe::stripe_map`], and serves pages
    /// straight out of memory.
    struct MemFixture {
        n: usize,
        page_size: u64,
        columns: HashMap<u32, Vec<u8>>,
    }

    impl MemFixture {
        fn build(data: &[u8], n: usize, page_size: u64) -> Self {
            assert_eq!(data.len() % (page_size as usize * (n - 1)), 0);
            let stripe_count = data.len() / (page_size as usize * (n - 1));
            let mut columns: HashMap<u32, Vec<u8>> = (0..n as u32).map(|c| (c, Vec::new())).collect();

            for s in 0..stripe_count as u64 {
                let slots = stripe::stripe_map(n, s);
                let order = stripe::data_column_order(&slots);
                let stripe_start = s as usize * page_size as usize * (n - 1);

                let mut data_pages: HashMap<usize, &[u8]> = HashMap::new();
                for (i, &column) in order.iter().enumerate() {
                    let start = stripe_start + i * page_size as usize;
                    data_pages.insert(column, &data[start..start + page_size as usize]);
                }

                let parity_column = slots.iter().position(|&v| v == stripe::PARITY).unwrap();
                let mut parity = vec![0u8; page_size as usize];
                for page in data_pages.values() {
                    for (p, b) in parity.iter_mut().zip(page.iter()) {
                        *p ^= b;
                    }
                }

                for c in 0..n {
                    if c == parity_column {
                        columns.get_mut(&(c as u32)).unwrap().extend_from_slice(&parity);
                    } else {
                        columns
                            .get_mut(&(c as u32))
                            .unwrap()
                            .extend_from_slice(data_pages[&c]);
                    }
                }
            }

            MemFixture { n, page_size, columns }
        }
    }

    impl PageSource for MemFixture {
        fn read_member_page(&self, raid_index: u32, page_start_byte: u64, page_size: u64) -> Result<Vec<u8>> {
            assert_eq!(page_size, self.page_size);
            let col = &self.columns[&raid_index];
            let start = page_start_byte as usize;
            Ok(col[start..start + page_size as usize].to_vec())
        }
    }

    fn geometry_for(n: usize, page_size: u64, per_member_bytes: u64) -> ArrayGeometry {
        use crate::geometry::MemberImage;
        let members = (0..n as u32)
            .map(|i| MemberImage {
                id: format!("m{i}"),
                raid_index: i,
                path: format!("m{i}").into(),
                start: 0,
                end: per_member_bytes,
            })
            .collect();
        ArrayGeometry::new(members, page_size).unwrap()
    }

    // Spec §8's S5/S6 worked examples use a toy P=4 to keep the illustration
    // readable; `ArrayGeometry::new` enforces §3's real invariant that P is
    // a positive power-of-two multiple of 1 KiB, so these tests exercise
    // the identical round-trip/partial-read shape at P=1024 (the smallest
    // legal page size) instead. `restore::restore`'s own `s5_round_trip_n3_p4`
    // test doesn't go through `ArrayGeometry` and keeps the literal spec bytes.

    #[test]
    fn round_trip_n3_smallest_legal_page_size() {
        let n = 3;
        let page_size = 1024u64;
        let stripe_count = 2u64;
        let data: Vec<u8> = (0..(stripe_count * page_size * (n as u64 - 1)))
            .map(|i| (i % 200) as u8 + 1)
            .collect();
        let fixture = MemFixture::build(&data, n, page_size);
        let geo = geometry_for(n, page_size, stripe_count * page_size);

        let mut out = vec![0u8; data.len()];
        pread(&fixture, &geo, 0, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn partial_read_spans_a_page_boundary_within_a_stripe() {
        let n = 3;
        let page_size = 1024u64;
        let stripe_count = 2u64;
        let data: Vec<u8> = (0..(stripe_count * page_size * (n as u64 - 1)))
            .map(|i| (i % 200) as u8 + 1)
            .collect();
        let fixture = MemFixture::build(&data, n, page_size);
        let geo = geometry_for(n, page_size, stripe_count * page_size);

        let offset = page_size - 3;
        let len = 7usize;
        let mut out = vec![0u8; len];
        pread(&fixture, &geo, offset, &mut out).unwrap();
        assert_eq!(out, data[offset as usize..offset as usize + len]);
    }

    #[test]
    fn translator_equivalence_over_random_offsets() {
        let n = 4;
        let page_size = 1024u64;
        let stripe_count = 10u64;
        let data: Vec<u8> = (0..(stripe_count * page_size * (n as u64 - 1)))
            .map(|i| (i % 251) as u8)
            .collect();
        let fixture = MemFixture::build(&data, n, page_size);
        let geo = geometry_for(n, page_size, stripe_count * page_size);

        for &(offset, len) in &[(0u64, 5usize), (1, 3000), (2000, 1), (0, data.len()), (5000, 200)] {
            let mut out = vec![0u8; len];
            pread(&fixture, &geo, offset, &mut out).unwrap();
            assert_eq!(out, data[offset as usize..offset as usize + len]);
        }
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let page_size = 1024u64;
        let geo = geometry_for(3, page_size, 2 * page_size);
        let fixture = MemFixture::build(&vec![0u8; (2 * page_size) as usize], 3, page_size);
        let mut out: Vec<u8> = Vec::new();
        assert!(matches!(pread(&fixture, &geo, 0, &mut out), Err(Error::BadShape(_))));
    }
}
