use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the manager, accepting user and disk connections.
    Manager(ManagerArgs),
    /// Register a user and request DSS allocations interactively.
    User(UserArgs),
    /// Register a disk and keep it registered until Ctrl+C.
    Disk(DiskArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ManagerArgs {
    /// Socket address the manager should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:7000")]
    pub listen: SocketAddr,
}

#[derive(Args, Debug, Clone)]
pub struct UserArgs {
    /// Display name for this user.
    #[arg(long)]
    pub name: String,

    /// User's listen port (recorded by the manager only).
    #[arg(long)]
    pub port: u16,

    /// Address of the manager.
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub manager: SocketAddr,
}

#[derive(Args, Debug, Clone)]
pub struct DiskArgs {
    /// Display name for this disk.
    #[arg(long)]
    pub name: String,

    /// Disk's listen port.
    #[arg(long)]
    pub port: u16,

    /// Address of the manager.
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub manager: SocketAddr,

    /// Capacity in bytes.
    #[arg(long)]
    pub capacity: u64,

    /// Free-form zone label.
    #[arg(long, default_value = "")]
    pub zone: String,
}
