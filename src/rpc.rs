//! Request dispatch and one-connection-at-a-time framing for the TCP RPC
//! surface. Kept in the library so both the server binary and integration
//! tests can drive a real connection against a real [`Engine`].

use std::io::{Read, Write};

use anyhow::Result;

use crate::engine::Engine;
use crate::wire::{self, Request, Response};

/// Maps one engine call to its wire response. Engine failures are carried
/// in-band via the `status` field, never as a transport-level error.
pub fn dispatch(engine: &Engine, request: Request) -> Response {
    match request {
        Request::Get { key } => match engine.get(&key) {
            Ok(value) => Response::get_ok(value),
            Err(e) => Response::get_err(e.to_string()),
        },
        Request::Set { key, value } => match engine.set(&key, &value) {
            Ok(()) => Response::set_ok(),
            Err(e) => Response::set_err(e.to_string()),
        },
        Request::Delete { key } => match engine.delete(&key) {
            Ok(()) => Response::delete_ok(),
            Err(e) => Response::delete_err(e.to_string()),
        },
        Request::Sync => match engine.sync() {
            Ok(()) => Response::sync_ok(),
            Err(e) => Response::Sync {
                status: e.to_string(),
            },
        },
    }
}

/// Serves requests off `stream` until the peer closes the connection.
pub fn serve_connection<S: Read + Write>(mut stream: S, engine: &Engine) -> Result<()> {
    loop {
        let request = match wire::read_request(&mut stream) {
            Ok(req) => req,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let response = dispatch(engine, request);
        wire::write_response(&mut stream, &response)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn get_set_delete_sync_round_trip_through_dispatch() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path()).unwrap();

        let rsp = dispatch(
            &engine,
            Request::Set {
                key: "k".to_string(),
                value: "v".to_string(),
            },
        );
        assert!(matches!(rsp, Response::Set { status } if status == wire::OK_STATUS));

        let rsp = dispatch(
            &engine,
            Request::Get {
                key: "k".to_string(),
            },
        );
        match rsp {
            Response::Get { status, value } => {
                assert_eq!(status, wire::OK_STATUS);
                assert_eq!(value, "v");
            }
            _ => panic!("wrong variant"),
        }

        let rsp = dispatch(&engine, Request::Sync);
        assert!(matches!(rsp, Response::Sync { status } if status == wire::OK_STATUS));

        let rsp = dispatch(
            &engine,
            Request::Delete {
                key: "k".to_string(),
            },
        );
        assert!(matches!(rsp, Response::Delete { status } if status == wire::OK_STATUS));

        let rsp = dispatch(
            &engine,
            Request::Get {
                key: "k".to_string(),
            },
        );
        match rsp {
            Response::Get { status, .. } => assert_eq!(status, "not found"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn serve_connection_answers_requests_over_a_real_socket() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(Engine::open(dir.path()).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        let server_engine = engine.clone();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve_connection(&stream, server_engine.as_ref()).unwrap();
        });

        let mut client = TcpStream::connect(address).unwrap();
        wire::write_request(
            &mut client,
            &Request::Set {
                key: "k".to_string(),
                value: "v".to_string(),
            },
        )
        .unwrap();
        let rsp = wire::read_response(&mut client).unwrap();
        assert!(matches!(rsp, Response::Set { status } if status == wire::OK_STATUS));

        wire::write_request(
            &mut client,
            &Request::Get {
                key: "k".to_string(),
            },
        )
        .unwrap();
        let rsp = wire::read_response(&mut client).unwrap();
        match rsp {
            Response::Get { status, value } => {
                assert_eq!(status, wire::OK_STATUS);
                assert_eq!(value, "v");
            }
            _ => panic!("wrong variant"),
        }

        drop(client);
        handle.join().unwrap();
    }
}
