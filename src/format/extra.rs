//! Zip extra fields carrying Unix metadata.
//!
//! The base zip header only stores a DOS timestamp and (for Unix-made
//! archives) a mode. Three widely supported extra fields fill the gaps:
//!
//! | Id | Name | Contents |
//! |----|------|----------|
//! | `0x5455` | Extended timestamp | mtime as Unix seconds (`i32`) |
//! | `0x7875` | Info-ZIP Unix (type 3) | uid and gid |
//! | `0x000a` | NTFS | mtime/atime/ctime as FILETIME (100ns) |

use crate::timestamp::MTime;

/// Extended timestamp extra field id.
pub const EXTENDED_TIMESTAMP: u16 = 0x5455;
/// Info-ZIP Unix uid/gid extra field id.
pub const UNIX_OWNER: u16 = 0x7875;
/// NTFS extra field id.
pub const NTFS: u16 = 0x000a;

/// Extended timestamp flag: modification time present.
const FLAG_MTIME: u8 = 0x01;
/// NTFS attribute tag holding the three timestamps.
const NTFS_TIMES_TAG: u16 = 0x0001;
const NTFS_TIMES_SIZE: u16 = 24;

/// Unix metadata recovered from a zip entry's extra data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnixExtra {
    /// Modification time, if any timestamp field was present.
    pub mtime: Option<MTime>,
    /// Owner user id.
    pub uid: Option<u32>,
    /// Owner group id.
    pub gid: Option<u32>,
}

/// Builds the extra fields describing `mtime`, `uid` and `gid`.
///
/// Fields whose value cannot be represented (e.g. an mtime outside the `i32`
/// range for the extended timestamp) are left out.
pub fn encode(mtime: MTime, uid: u32, gid: u32) -> Vec<(u16, Box<[u8]>)> {
    let mut fields = Vec::with_capacity(3);

    if let Some(secs) = mtime.to_unix_i32() {
        let mut data = Vec::with_capacity(5);
        data.push(FLAG_MTIME);
        data.extend_from_slice(&secs.to_le_bytes());
        fields.push((EXTENDED_TIMESTAMP, data.into_boxed_slice()));
    }

    let mut owner = Vec::with_capacity(11);
    owner.push(1); // version
    owner.push(4);
    owner.extend_from_slice(&uid.to_le_bytes());
    owner.push(4);
    owner.extend_from_slice(&gid.to_le_bytes());
    fields.push((UNIX_OWNER, owner.into_boxed_slice()));

    if let Some(filetime) = mtime.to_filetime() {
        let mut ntfs = Vec::with_capacity(32);
        ntfs.extend_from_slice(&[0; 4]); // reserved
        ntfs.extend_from_slice(&NTFS_TIMES_TAG.to_le_bytes());
        ntfs.extend_from_slice(&NTFS_TIMES_SIZE.to_le_bytes());
        for _ in 0..3 {
            ntfs.extend_from_slice(&filetime.to_le_bytes());
        }
        fields.push((NTFS, ntfs.into_boxed_slice()));
    }

    fields
}

/// Parses the raw extra data block of a zip entry.
///
/// Unknown or malformed fields are skipped. The NTFS mtime wins over the
/// extended timestamp because it keeps sub-second precision.
pub fn parse(mut data: &[u8]) -> UnixExtra {
    let mut extra = UnixExtra::default();
    let mut seconds = None;
    let mut precise = None;

    while data.len() >= 4 {
        let id = u16::from_le_bytes([data[0], data[1]]);
        let len = usize::from(u16::from_le_bytes([data[2], data[3]]));
        let Some(body) = data.get(4..4 + len) else {
            log::debug!("Truncated zip extra field {:#06x}", id);
            break;
        };

        match id {
            EXTENDED_TIMESTAMP => seconds = parse_extended_timestamp(body),
            UNIX_OWNER => {
                if let Some((uid, gid)) = parse_unix_owner(body) {
                    extra.uid = Some(uid);
                    extra.gid = Some(gid);
                }
            }
            NTFS => precise = parse_ntfs(body),
            _ => {}
        }

        data = &data[4 + len..];
    }

    extra.mtime = precise.or(seconds);
    extra
}

fn parse_extended_timestamp(body: &[u8]) -> Option<MTime> {
    let (&flags, rest) = body.split_first()?;
    if flags & FLAG_MTIME == 0 {
        return None;
    }
    let secs = i32::from_le_bytes(rest.get(..4)?.try_into().ok()?);
    Some(MTime::from_secs(i64::from(secs)))
}

fn parse_unix_owner(body: &[u8]) -> Option<(u32, u32)> {
    let (&version, rest) = body.split_first()?;
    if version != 1 {
        return None;
    }
    let (uid, rest) = read_sized_id(rest)?;
    let (gid, _) = read_sized_id(rest)?;
    Some((uid, gid))
}

/// Reads a little-endian id prefixed by its byte length.
fn read_sized_id(data: &[u8]) -> Option<(u32, &[u8])> {
    let (&size, rest) = data.split_first()?;
    let size = usize::from(size);
    let bytes = rest.get(..size)?;
    if size > 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf[..size].copy_from_slice(bytes);
    let id = u32::try_from(u64::from_le_bytes(buf)).ok()?;
    Some((id, &rest[size..]))
}

fn parse_ntfs(body: &[u8]) -> Option<MTime> {
    let mut attrs = body.get(4..)?;
    while attrs.len() >= 4 {
        let tag = u16::from_le_bytes([attrs[0], attrs[1]]);
        let size = usize::from(u16::from_le_bytes([attrs[2], attrs[3]]));
        let value = attrs.get(4..4 + size)?;
        if tag == NTFS_TIMES_TAG && size >= 8 {
            let filetime = u64::from_le_bytes(value[..8].try_into().ok()?);
            return Some(MTime::from_filetime(filetime));
        }
        attrs = &attrs[4 + size..];
    }
    None
}
