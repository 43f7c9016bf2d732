//! Positional save-state stream.
//!
//! Objects persist by transferring their fields, one after another, through a
//! [`PersistMgr`]. The same `persist` routine is used in both directions: while
//! saving it appends each value, while loading it overwrites each value from
//! the stream. Nothing in the stream names a field, so the transfer order of a
//! type is its format.
//!
//! A finished stream can be wrapped in a small envelope ([`encode_save`]) that
//! tags it with a magic and a format revision.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Bytes that prefix every save envelope ("WMES").
pub const SAVE_MAGIC: [u8; 4] = *b"WMES";

/// Envelope revision written by this crate.
pub const SAVE_VERSION: u16 = 0x0001;

/// Length of the envelope header in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistError {
    #[error("stream truncated reading '{field}': needed {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("field '{field}' is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("field '{field}' holds {value}, expected a boolean")]
    InvalidBool { field: &'static str, value: u8 },
    #[error("'{field}' is not available in this direction")]
    WrongMode { field: &'static str },
    #[error("save envelope magic mismatch")]
    BadMagic,
    #[error("save envelope revision {0:#06x} is unknown")]
    UnknownVersion(u16),
}

enum Direction {
    Saving(BytesMut),
    Loading(Bytes),
}

/// Cursor over a save-state stream in one direction.
pub struct PersistMgr {
    direction: Direction,
}

impl PersistMgr {
    pub fn for_saving() -> Self {
        Self {
            direction: Direction::Saving(BytesMut::new()),
        }
    }

    pub fn for_loading(data: impl Into<Bytes>) -> Self {
        Self {
            direction: Direction::Loading(data.into()),
        }
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.direction, Direction::Saving(_))
    }

    /// Unread bytes while loading, zero while saving.
    pub fn remaining(&self) -> usize {
        match &self.direction {
            Direction::Saving(_) => 0,
            Direction::Loading(data) => data.remaining(),
        }
    }

    /// Returns the written stream.
    pub fn finish(self) -> Result<Bytes, PersistError> {
        match self.direction {
            Direction::Saving(out) => Ok(out.freeze()),
            Direction::Loading(_) => Err(PersistError::WrongMode { field: "finish" }),
        }
    }

    /// Saves `len` or reads back an element count. A count whose elements
    /// could not fit in the unread stream, at `min_element` bytes each, is
    /// rejected before anything is allocated for them.
    pub fn transfer_count(
        &mut self,
        field: &'static str,
        len: usize,
        min_element: usize,
    ) -> Result<usize, PersistError> {
        let mut count = len as u32;
        count.transfer(field, self)?;
        let count = count as usize;
        let needed = count.saturating_mul(min_element.max(1));
        if !self.is_saving() && needed > self.remaining() {
            return Err(PersistError::Truncated {
                field,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Saves or restores `value`, depending on the direction.
    pub fn transfer<T: Transfer + ?Sized>(
        &mut self,
        field: &'static str,
        value: &mut T,
    ) -> Result<(), PersistError> {
        value.transfer(field, self)
    }

    fn writer(&mut self) -> Option<&mut BytesMut> {
        match &mut self.direction {
            Direction::Saving(out) => Some(out),
            Direction::Loading(_) => None,
        }
    }

    /// Loading side: the stream, after checking `needed` bytes are left.
    fn reader(&mut self, field: &'static str, needed: usize) -> Result<&mut Bytes, PersistError> {
        match &mut self.direction {
            Direction::Saving(_) => Err(PersistError::WrongMode { field }),
            Direction::Loading(data) if data.remaining() < needed => Err(PersistError::Truncated {
                field,
                needed,
                remaining: data.remaining(),
            }),
            Direction::Loading(data) => Ok(data),
        }
    }
}

/// A value that can travel through a [`PersistMgr`].
pub trait Transfer {
    fn transfer(&mut self, field: &'static str, mgr: &mut PersistMgr) -> Result<(), PersistError>;
}

macro_rules! transfer_scalar {
    ($ty:ty, $put:ident, $get:ident) => {
        impl Transfer for $ty {
            fn transfer(
                &mut self,
                field: &'static str,
                mgr: &mut PersistMgr,
            ) -> Result<(), PersistError> {
                if let Some(out) = mgr.writer() {
                    out.$put(*self);
                } else {
                    *self = mgr.reader(field, std::mem::size_of::<$ty>())?.$get();
                }
                Ok(())
            }
        }
    };
}

transfer_scalar!(u8, put_u8, get_u8);
transfer_scalar!(i32, put_i32_le, get_i32_le);
transfer_scalar!(u32, put_u32_le, get_u32_le);
transfer_scalar!(f32, put_f32_le, get_f32_le);
transfer_scalar!(f64, put_f64_le, get_f64_le);

impl Transfer for bool {
    fn transfer(&mut self, field: &'static str, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        let mut raw = u8::from(*self);
        raw.transfer(field, mgr)?;
        *self = match raw {
            0 => false,
            1 => true,
            value => return Err(PersistError::InvalidBool { field, value }),
        };
        Ok(())
    }
}

impl Transfer for String {
    fn transfer(&mut self, field: &'static str, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        if let Some(out) = mgr.writer() {
            out.put_u32_le(self.len() as u32);
            out.put_slice(self.as_bytes());
            return Ok(());
        }
        let len = mgr.reader(field, 4)?.get_u32_le() as usize;
        let raw = mgr.reader(field, len)?.copy_to_bytes(len);
        *self = String::from_utf8(raw.to_vec()).map_err(|_| PersistError::InvalidUtf8 { field })?;
        Ok(())
    }
}

impl Transfer for Option<String> {
    fn transfer(&mut self, field: &'static str, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        let mut present = self.is_some();
        present.transfer(field, mgr)?;
        if mgr.is_saving() {
            if let Some(value) = self {
                value.transfer(field, mgr)?;
            }
        } else if present {
            let mut value = String::new();
            value.transfer(field, mgr)?;
            *self = Some(value);
        } else {
            *self = None;
        }
        Ok(())
    }
}

impl Transfer for Vec<String> {
    fn transfer(&mut self, field: &'static str, mgr: &mut PersistMgr) -> Result<(), PersistError> {
        // Each string carries at least its length prefix.
        let count = mgr.transfer_count(field, self.len(), 4)?;
        if !mgr.is_saving() {
            self.clear();
            self.resize(count, String::new());
        }
        for item in self.iter_mut() {
            item.transfer(field, mgr)?;
        }
        Ok(())
    }
}

/// An object whose state survives a save/load boundary.
pub trait Persist {
    fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError>;
}

/// Wraps a finished stream with the save envelope.
pub fn encode_save(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&SAVE_MAGIC);
    out.put_u16(SAVE_VERSION);
    out.put_u32(payload.len() as u32);
    out.extend_from_slice(payload);
    out
}

/// Checks the envelope and returns the stream it carries.
pub fn decode_save(bytes: &[u8]) -> Result<&[u8], PersistError> {
    if bytes.len() < HEADER_LEN {
        return Err(PersistError::Truncated {
            field: "header",
            needed: HEADER_LEN,
            remaining: bytes.len(),
        });
    }
    if bytes[..4] != SAVE_MAGIC {
        return Err(PersistError::BadMagic);
    }
    let mut header = &bytes[4..HEADER_LEN];
    let version = header.get_u16();
    if version != SAVE_VERSION {
        return Err(PersistError::UnknownVersion(version));
    }
    let length = header.get_u32() as usize;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < length {
        return Err(PersistError::Truncated {
            field: "payload",
            needed: length,
            remaining: payload.len(),
        });
    }
    Ok(&payload[..length])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        delay: u32,
        offset: i32,
        scale: f32,
        visible: bool,
        name: String,
        sound: Option<String>,
        events: Vec<String>,
    }

    impl Persist for Sample {
        fn persist(&mut self, mgr: &mut PersistMgr) -> Result<(), PersistError> {
            mgr.transfer("delay", &mut self.delay)?;
            mgr.transfer("offset", &mut self.offset)?;
            mgr.transfer("scale", &mut self.scale)?;
            mgr.transfer("visible", &mut self.visible)?;
            mgr.transfer("name", &mut self.name)?;
            mgr.transfer("sound", &mut self.sound)?;
            mgr.transfer("events", &mut self.events)?;
            Ok(())
        }
    }

    fn sample() -> Sample {
        Sample {
            delay: 120,
            offset: -4,
            scale: 0.5,
            visible: true,
            name: "walk_02".to_string(),
            sound: Some("step.ogg".to_string()),
            events: vec!["Left".to_string(), "Right".to_string()],
        }
    }

    #[test]
    fn restores_fields_in_transfer_order() {
        let mut item = sample();
        let mut saver = PersistMgr::for_saving();
        item.persist(&mut saver).expect("save");
        let stream = saver.finish().expect("bytes");

        let mut loader = PersistMgr::for_loading(stream);
        let mut restored = Sample {
            events: vec!["Stale".to_string(); 3],
            ..Sample::default()
        };
        restored.persist(&mut loader).expect("load");
        assert_eq!(restored, item);
        assert_eq!(loader.remaining(), 0);
    }

    #[test]
    fn oversized_string_list_count_is_rejected() {
        let mut loader = PersistMgr::for_loading(vec![0xffu8, 0xff, 0xff, 0xff]);
        let mut events = vec!["kept".to_string()];
        assert_eq!(
            loader.transfer("events", &mut events),
            Err(PersistError::Truncated {
                field: "events",
                needed: 0xffff_ffff_usize.saturating_mul(4),
                remaining: 0
            })
        );

        let mut loader = PersistMgr::for_loading(vec![2u8, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            loader.transfer_count("events", 0, 4),
            Err(PersistError::Truncated { needed: 8, remaining: 4, .. })
        ));
    }

    #[test]
    fn little_endian_layout() {
        let mut saver = PersistMgr::for_saving();
        let mut value = 0x0102_0304_u32;
        saver.transfer("value", &mut value).expect("save");
        let mut flag = true;
        saver.transfer("flag", &mut flag).expect("save");
        let stream = saver.finish().expect("bytes");
        assert_eq!(&stream[..], &[4, 3, 2, 1, 1]);
    }

    #[test]
    fn truncated_stream_names_the_field() {
        let mut loader = PersistMgr::for_loading(vec![1u8, 0]);
        let mut value = 0u32;
        assert_eq!(
            loader.transfer("delay", &mut value),
            Err(PersistError::Truncated {
                field: "delay",
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn rejects_bad_booleans_and_utf8() {
        let mut loader = PersistMgr::for_loading(vec![7u8]);
        let mut flag = false;
        assert_eq!(
            loader.transfer("visible", &mut flag),
            Err(PersistError::InvalidBool {
                field: "visible",
                value: 7
            })
        );

        let mut loader = PersistMgr::for_loading(vec![1u8, 0, 0, 0, 0xff]);
        let mut name = String::new();
        assert_eq!(
            loader.transfer("name", &mut name),
            Err(PersistError::InvalidUtf8 { field: "name" })
        );
    }

    #[test]
    fn finish_is_saving_only() {
        let loader = PersistMgr::for_loading(Vec::<u8>::new());
        assert_eq!(
            loader.finish().unwrap_err(),
            PersistError::WrongMode { field: "finish" }
        );
    }

    #[test]
    fn envelope_round_trip_and_checks() {
        let framed = encode_save(b"state");
        assert_eq!(&framed[..4], b"WMES");
        assert_eq!(decode_save(&framed).expect("decoded"), b"state");

        let mut bad = framed.clone();
        bad[0] = b'X';
        assert_eq!(decode_save(&bad), Err(PersistError::BadMagic));
        assert!(matches!(
            decode_save(&framed[..framed.len() - 1]),
            Err(PersistError::Truncated { .. })
        ));
    }
}
