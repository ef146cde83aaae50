//! Per-connection request/response loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::{Frame, receive_frame, send_frame};
use crate::message::{Request, Response};
use crate::protocol::{MessageType, Status};
use crate::registry::Registry;

/// Serves one peer: receive a frame, run the matching registry operation,
/// answer with the same transaction id. Never sends unsolicited frames.
pub struct Dispatcher {
    registry: Arc<Registry>,
    peer: SocketAddr,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, peer: SocketAddr) -> Self {
        Self { registry, peer }
    }

    /// Loops until the peer disconnects (`Ok`) or the transport fails (`Err`).
    pub async fn run<S>(&self, stream: &mut S) -> ProtocolResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let frame = match receive_frame(stream).await {
                Ok(frame) => frame,
                Err(err) if err.is_disconnect() => {
                    debug!(peer = %self.peer, "peer disconnected");
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            debug!(
                peer = %self.peer,
                msg_type = frame.msg_type,
                txn_id = frame.txn_id,
                "frame received"
            );

            let txn_id = frame.txn_id;
            let response = self.handle_frame(frame).await?;
            let payload = response.encode()?;
            send_frame(stream, response.message_type().as_u8(), txn_id, &payload).await?;
        }
    }

    /// Turns one inbound frame into its response.
    ///
    /// Bad registration payloads and unknown types become `ERROR_RESP`; any
    /// other undecodable payload ends the connection.
    pub async fn handle_frame(&self, frame: Frame) -> ProtocolResult<Response> {
        let registration =
            MessageType::from_u8(frame.msg_type).is_some_and(MessageType::is_registration);

        match Request::decode(frame.msg_type, frame.payload) {
            Ok(request) => Ok(self.handle_request(request).await),
            Err(err @ ProtocolError::UnknownMessageType(_)) => {
                Ok(Response::error(Status::InvalidArgument, err.to_string()))
            }
            Err(err) if registration => {
                Ok(Response::error(Status::InvalidArgument, err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::RegisterUser { name, listen_port } => {
                self.register_user(name, listen_port).await
            }
            Request::RegisterDisk {
                name,
                listen_port,
                capacity_bytes,
                zone,
            } => {
                self.register_disk(name, listen_port, capacity_bytes, zone)
                    .await
            }
            Request::ConfigureDss {
                disk_count,
                policy,
                constraints,
            } => self.configure_dss(disk_count, &policy, &constraints).await,
            Request::DeregisterUser { user_id } => {
                let removed = self.registry.deregister_user(user_id).await;
                info!(peer = %self.peer, user_id, removed, "deregister user");
                Response::DeregisterUser {
                    status: removal_status(removed),
                }
            }
            Request::DeregisterDisk { disk_id } => {
                let removed = self.registry.deregister_disk(disk_id).await;
                info!(peer = %self.peer, disk_id, removed, "deregister disk");
                Response::DeregisterDisk {
                    status: removal_status(removed),
                }
            }
        }
    }

    async fn register_user(&self, name: String, listen_port: u16) -> Response {
        if name.is_empty() || listen_port == 0 {
            return Response::error(Status::InvalidArgument, "missing name/port");
        }

        let user_id = self
            .registry
            .register_user(name.clone(), self.peer.ip(), listen_port)
            .await;
        info!(peer = %self.peer, user_id, %name, listen_port, "user registered");
        Response::RegisterUser {
            status: Status::Ok,
            user_id,
        }
    }

    async fn register_disk(
        &self,
        name: String,
        listen_port: u16,
        capacity_bytes: u64,
        zone: String,
    ) -> Response {
        if name.is_empty() || listen_port == 0 || capacity_bytes == 0 {
            return Response::error(Status::InvalidArgument, "bad disk args");
        }

        let disk_id = self
            .registry
            .register_disk(name.clone(), self.peer.ip(), listen_port, capacity_bytes, zone)
            .await;
        info!(peer = %self.peer, disk_id, %name, capacity_bytes, "disk registered");
        Response::RegisterDisk {
            status: Status::Ok,
            disk_id,
        }
    }

    async fn configure_dss(&self, disk_count: u16, policy: &str, constraints: &str) -> Response {
        if disk_count == 0 {
            return Response::configure_failed(Status::InvalidArgument);
        }

        let Some(disk_ids) = self.registry.allocate_disks(disk_count.into()).await else {
            info!(peer = %self.peer, disk_count, "not enough disks for dss");
            return Response::configure_failed(Status::InsufficientResources);
        };
        let dss_id = self.registry.next_dss_id().await;

        info!(peer = %self.peer, dss_id, ?disk_ids, policy, constraints, "dss configured");
        Response::ConfigureDss {
            status: Status::Ok,
            dss_id,
            disk_ids,
        }
    }
}

fn removal_status(removed: bool) -> Status {
    if removed {
        Status::Ok
    } else {
        Status::NotRegistered
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn dispatcher() -> Dispatcher {
        let peer: SocketAddr = "10.0.0.7:41000".parse().expect("valid addr");
        Dispatcher::new(Arc::new(Registry::new()), peer)
    }

    fn frame(msg_type: MessageType, payload: Bytes) -> Frame {
        Frame {
            msg_type: msg_type.as_u8(),
            txn_id: 1,
            payload,
        }
    }

    #[tokio::test]
    async fn registration_records_the_connection_address() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle_request(Request::RegisterUser {
                name: "alice".into(),
                listen_port: 6000,
            })
            .await;
        assert_eq!(
            response,
            Response::RegisterUser {
                status: Status::Ok,
                user_id: 1
            }
        );

        let user = dispatcher.registry.user(1).await.expect("user stored");
        assert_eq!(user.addr.to_string(), "10.0.0.7");
        assert_eq!(user.port, 6000);
    }

    #[tokio::test]
    async fn invalid_registrations_become_error_responses() {
        let dispatcher = dispatcher();
        let cases = [
            (
                Request::RegisterUser {
                    name: String::new(),
                    listen_port: 1,
                },
                "missing name/port",
            ),
            (
                Request::RegisterUser {
                    name: "u".into(),
                    listen_port: 0,
                },
                "missing name/port",
            ),
            (
                Request::RegisterDisk {
                    name: "d".into(),
                    listen_port: 1,
                    capacity_bytes: 0,
                    zone: String::new(),
                },
                "bad disk args",
            ),
        ];

        for (request, message) in cases {
            assert_eq!(
                dispatcher.handle_request(request).await,
                Response::error(Status::InvalidArgument, message)
            );
        }
        assert!(dispatcher.registry.users().await.is_empty());
        assert!(dispatcher.registry.disks().await.is_empty());
    }

    #[tokio::test]
    async fn truncated_registration_is_answered() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle_frame(frame(MessageType::RegisterDiskReq, Bytes::from_static(&[0, 4, b'd'])))
            .await
            .expect("registration errors are recoverable");
        assert_eq!(
            response,
            Response::error(Status::InvalidArgument, "truncated payload")
        );
    }

    #[tokio::test]
    async fn truncated_deregistration_is_fatal() {
        let dispatcher = dispatcher();
        let result = dispatcher
            .handle_frame(frame(MessageType::DeregisterUserReq, Bytes::from_static(&[0, 0])))
            .await;
        assert!(matches!(result, Err(ProtocolError::TruncatedPayload)));
    }

    #[tokio::test]
    async fn unknown_type_is_answered_with_its_number() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle_frame(Frame {
                msg_type: 0x99,
                txn_id: 3,
                payload: Bytes::new(),
            })
            .await
            .expect("unknown types are recoverable");
        assert_eq!(
            response,
            Response::error(Status::InvalidArgument, "unknown msg_type 153")
        );
    }

    #[tokio::test]
    async fn configure_rejects_zero_disks() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle_request(Request::ConfigureDss {
                disk_count: 0,
                policy: "RAID0".into(),
                constraints: String::new(),
            })
            .await;
        assert_eq!(response, Response::configure_failed(Status::InvalidArgument));
    }

    #[tokio::test]
    async fn failed_allocation_does_not_consume_a_dss_id() {
        let dispatcher = dispatcher();
        let configure = |disk_count| Request::ConfigureDss {
            disk_count,
            policy: String::new(),
            constraints: String::new(),
        };

        assert_eq!(
            dispatcher.handle_request(configure(1)).await,
            Response::configure_failed(Status::InsufficientResources)
        );

        dispatcher
            .registry
            .register_disk("d1".into(), dispatcher.peer.ip(), 9000, 1, String::new())
            .await;
        assert_eq!(
            dispatcher.handle_request(configure(1)).await,
            Response::ConfigureDss {
                status: Status::Ok,
                dss_id: 1,
                disk_ids: vec![1]
            }
        );
    }

    #[tokio::test]
    async fn run_echoes_transaction_ids_until_eof() {
        let dispatcher = dispatcher();
        let (mut client, mut server) = tokio::io::duplex(1024);

        let payload = Request::DeregisterDisk { disk_id: 5 }.encode().unwrap();
        send_frame(&mut client, MessageType::DeregisterDiskReq.as_u8(), 0xDEAD_BEEF, &payload)
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        dispatcher.run(&mut server).await.expect("clean close");

        let reply = receive_frame(&mut client).await.expect("reply frame");
        assert_eq!(reply.msg_type, MessageType::DeregisterDiskResp.as_u8());
        assert_eq!(reply.txn_id, 0xDEAD_BEEF);
        assert_eq!(
            Response::decode(reply.msg_type, reply.payload).unwrap(),
            Response::DeregisterDisk {
                status: Status::NotRegistered
            }
        );
    }
}
