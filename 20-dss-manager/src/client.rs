//! Thin collaborators of the manager: a request client plus the `user` and
//! `disk` command loops built on it.

use std::future::Future;

use anyhow::{Context, Result, anyhow, bail};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpStream, ToSocketAddrs},
    select,
};
use tracing::{info, warn};

use crate::{
    cli::{DiskArgs, UserArgs},
    console::UserCommand,
    frame::{receive_frame, send_frame},
    message::{Request, Response},
    protocol::Status,
    registry::{DiskId, DssId, UserId},
};

/// Default placement policy sent by the interactive `cfg` command.
pub const DEFAULT_POLICY: &str = "RAID0";

/// Successful `CONFIGURE_DSS` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DssAllocation {
    pub dss_id: DssId,
    pub disk_ids: Vec<DiskId>,
}

/// One connection to the manager. Transaction ids count up from 1.
pub struct ManagerClient {
    stream: TcpStream,
    next_txn_id: u32,
}

impl ManagerClient {
    pub async fn connect<A>(addr: A) -> Result<Self>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let stream = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("failed to connect to {addr:?}"))?;
        Ok(Self {
            stream,
            next_txn_id: 1,
        })
    }

    /// Sends one request and waits for the matching response.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        let txn_id = self.next_txn_id;
        self.next_txn_id = self.next_txn_id.wrapping_add(1);

        let payload = request.encode()?;
        send_frame(
            &mut self.stream,
            request.message_type().as_u8(),
            txn_id,
            &payload,
        )
        .await?;

        let frame = receive_frame(&mut self.stream).await?;
        if frame.txn_id != txn_id {
            bail!(
                "response txn_id {} does not match request {}",
                frame.txn_id,
                txn_id
            );
        }
        Ok(Response::decode(frame.msg_type, frame.payload)?)
    }

    pub async fn register_user(&mut self, name: &str, listen_port: u16) -> Result<UserId> {
        let request = Request::RegisterUser {
            name: name.to_string(),
            listen_port,
        };
        match self.call(&request).await? {
            Response::RegisterUser {
                status: Status::Ok,
                user_id,
            } => Ok(user_id),
            other => Err(unexpected("register user", other)),
        }
    }

    pub async fn register_disk(
        &mut self,
        name: &str,
        listen_port: u16,
        capacity_bytes: u64,
        zone: &str,
    ) -> Result<DiskId> {
        let request = Request::RegisterDisk {
            name: name.to_string(),
            listen_port,
            capacity_bytes,
            zone: zone.to_string(),
        };
        match self.call(&request).await? {
            Response::RegisterDisk {
                status: Status::Ok,
                disk_id,
            } => Ok(disk_id),
            other => Err(unexpected("register disk", other)),
        }
    }

    /// Returns the failure status as `Err(status)` so callers can tell
    /// `INSUFFICIENT_RESOURCES` from a transport problem.
    pub async fn configure_dss(
        &mut self,
        disk_count: u16,
        policy: &str,
        constraints: &str,
    ) -> Result<std::result::Result<DssAllocation, Status>> {
        let request = Request::ConfigureDss {
            disk_count,
            policy: policy.to_string(),
            constraints: constraints.to_string(),
        };
        match self.call(&request).await? {
            Response::ConfigureDss {
                status: Status::Ok,
                dss_id,
                disk_ids,
            } => Ok(Ok(DssAllocation { dss_id, disk_ids })),
            Response::ConfigureDss { status, .. } => Ok(Err(status)),
            other => Err(unexpected("configure dss", other)),
        }
    }

    pub async fn deregister_user(&mut self, user_id: UserId) -> Result<Status> {
        match self.call(&Request::DeregisterUser { user_id }).await? {
            Response::DeregisterUser { status } => Ok(status),
            other => Err(unexpected("deregister user", other)),
        }
    }

    pub async fn deregister_disk(&mut self, disk_id: DiskId) -> Result<Status> {
        match self.call(&Request::DeregisterDisk { disk_id }).await? {
            Response::DeregisterDisk { status } => Ok(status),
            other => Err(unexpected("deregister disk", other)),
        }
    }
}

fn unexpected(operation: &str, response: Response) -> anyhow::Error {
    match response {
        Response::Error { status, message } => anyhow!("ERROR {status}: {message}"),
        other => anyhow!("{operation} failed: {}", other.status()),
    }
}

/// Registers a disk, then deregisters it on ctrl-c.
pub async fn run_disk(args: DiskArgs) -> Result<()> {
    let mut client = ManagerClient::connect(args.manager).await?;
    info!("connected to {}", args.manager);

    let disk_id = client
        .register_disk(&args.name, args.port, args.capacity, &args.zone)
        .await?;
    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
    let early = install(&mut ctrl_c).await;
    write_stdout(&format!("Registered disk_id={disk_id}")).await?;
    write_stdout("Disk running; Ctrl+C to deregister").await?;

    let signalled = match early {
        Some(result) => result,
        None => ctrl_c.await,
    };
    if let Err(error) = signalled {
        warn!(?error, "ctrl-c handler failed");
    }

    let status = client.deregister_disk(disk_id).await?;
    write_stdout(&format!("Deregister status={status}")).await?;
    Ok(())
}

/// Registers a user and runs the `cfg N | bye` prompt.
pub async fn run_user(args: UserArgs) -> Result<()> {
    let mut client = ManagerClient::connect(args.manager).await?;
    info!("connected to {}", args.manager);

    let user_id = client.register_user(&args.name, args.port).await?;
    let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
    if install(&mut ctrl_c).await.is_some() {
        deregister_quietly(&mut client, user_id).await;
        return Ok(());
    }
    write_stdout(&format!("Registered user_id={user_id}")).await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    loop {
        input.clear();
        write_prompt().await?;
        select! {
            bytes_read = stdin.read_line(&mut input) => {
                if bytes_read? == 0 {
                    deregister_quietly(&mut client, user_id).await;
                    break;
                }
                if !handle_user_input(&mut client, user_id, &input).await? {
                    break;
                }
            }
            signalled = &mut ctrl_c => {
                if let Err(error) = signalled {
                    warn!(?error, "ctrl-c handler failed");
                }
                deregister_quietly(&mut client, user_id).await;
                break;
            }
        }
    }

    Ok(())
}

async fn handle_user_input(
    client: &mut ManagerClient,
    user_id: UserId,
    input: &str,
) -> Result<bool> {
    let command = match UserCommand::parse(input) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(err) => {
            write_stdout(&err.to_string()).await?;
            return Ok(true);
        }
    };

    match command {
        UserCommand::Configure { disk_count } => {
            match client.configure_dss(disk_count, DEFAULT_POLICY, "").await? {
                Ok(DssAllocation { dss_id, disk_ids }) => {
                    let line = format!("DSS created dss_id={dss_id} disks={disk_ids:?}");
                    write_stdout(&line).await?;
                }
                Err(status) => write_stdout(&format!("Configure failed: {status}")).await?,
            }
            Ok(true)
        }
        UserCommand::Bye => {
            let status = client.deregister_user(user_id).await?;
            write_stdout(&format!("Deregister status={status}")).await?;
            Ok(false)
        }
    }
}

/// Polls `signal` once so its handler is in place before the caller
/// announces itself. Returns the output if it was already ready.
async fn install<F>(signal: &mut F) -> Option<F::Output>
where
    F: Future + Unpin,
{
    select! {
        biased;
        output = signal => Some(output),
        _ = std::future::ready(()) => None,
    }
}

async fn deregister_quietly(client: &mut ManagerClient, user_id: UserId) {
    if let Err(error) = client.deregister_user(user_id).await {
        warn!(?error, "failed to deregister user on exit");
    }
}

async fn write_prompt() -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
