//! The request/response schema carried over the TCP RPC surface.
//!
//! Each frame is a 4-byte big-endian length prefix followed by a
//! `bincode`-encoded [`Request`] or [`Response`]. `status` is the literal
//! string `"ok"` on success, or the textual error message otherwise —
//! engine failures are carried in-band, never as a transport-level error.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Frames larger than this are rejected outright rather than trusted to
/// drive an allocation; the schema below never legitimately needs more.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

pub const OK_STATUS: &str = "ok";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Get { key: String },
    Set { key: String, value: String },
    Delete { key: String },
    Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Get { status: String, value: String },
    Set { status: String },
    Delete { status: String },
    Sync { status: String },
}

impl Response {
    pub fn get_ok(value: String) -> Self {
        Response::Get {
            status: OK_STATUS.to_string(),
            value,
        }
    }

    pub fn get_err(message: String) -> Self {
        Response::Get {
            status: message,
            value: String::new(),
        }
    }

    pub fn set_ok() -> Self {
        Response::Set {
            status: OK_STATUS.to_string(),
        }
    }

    pub fn set_err(message: String) -> Self {
        Response::Set { status: message }
    }

    pub fn delete_ok() -> Self {
        Response::Delete {
            status: OK_STATUS.to_string(),
        }
    }

    pub fn delete_err(message: String) -> Self {
        Response::Delete { status: message }
    }

    pub fn sync_ok() -> Self {
        Response::Sync {
            status: OK_STATUS.to_string(),
        }
    }
}

pub fn write_request(w: &mut impl Write, req: &Request) -> io::Result<()> {
    write_frame(w, req)
}

pub fn read_request(r: &mut impl Read) -> io::Result<Request> {
    read_frame(r)
}

pub fn write_response(w: &mut impl Write, rsp: &Response) -> io::Result<()> {
    write_frame(w, rsp)
}

pub fn read_response(r: &mut impl Read) -> io::Result<Response> {
    read_frame(r)
}

fn write_frame(w: &mut impl Write, value: &impl Serialize) -> io::Result<()> {
    let body = bincode::serialize(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(&body)?;
    w.flush()
}

fn read_frame<T: for<'de> Deserialize<'de>>(r: &mut impl Read) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
    }

    let mut body = vec![0u8; len as usize];
    r.read_exact(&mut body)?;

    bincode::deserialize(&body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn request_round_trips_over_a_frame() {
        let req = Request::Set {
            key: "k".to_string(),
            value: "v".to_string(),
        };

        let mut buf = Vec::new();
        write_request(&mut buf, &req).unwrap();

        let decoded = read_request(&mut Cursor::new(buf)).unwrap();
        match decoded {
            Request::Set { key, value } => {
                assert_eq!(key, "k");
                assert_eq!(value, "v");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn response_round_trips_over_a_frame() {
        let rsp = Response::get_ok("v".to_string());

        let mut buf = Vec::new();
        write_response(&mut buf, &rsp).unwrap();

        let decoded = read_response(&mut Cursor::new(buf)).unwrap();
        match decoded {
            Response::Get { status, value } => {
                assert_eq!(status, OK_STATUS);
                assert_eq!(value, "v");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let err = read_request(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
