//! TCP reactor built on async-std.
//!
//! Every transport spawns a task that connects and then writes, plus a task
//! that reads. Whatever they observe travels back as a [`Notice`] over one
//! channel, and [`Driver`] turns those notices into client events on the
//! caller's task. The client itself never leaves that task.

use std::io;
use std::net::Shutdown;

use async_std::channel::{unbounded, Receiver, Sender};
use async_std::net::TcpStream;
use async_std::prelude::*;
use async_std::task;
use bytes::Bytes;

use crate::buffer::Buffer;
use crate::client::{MemcachedClient, Options};
use crate::constants::EventFlags;
use crate::errors::{ErrorKind, Result};
use crate::transport::{Event, Reactor, Transport};

const READ_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug)]
pub enum Incoming {
    Data(Vec<u8>),
    Status(EventFlags),
}

/// Something a transport's tasks observed, stamped with the transport's
/// generation so notices from replaced transports can be told apart.
#[derive(Debug)]
pub struct Notice {
    pub generation: u64,
    pub incoming: Incoming,
}

enum Outgoing {
    Data(Bytes),
    Shutdown,
}

#[derive(Debug)]
pub struct TcpReactor {
    notices: Sender<Notice>,
    generation: u64,
}

impl TcpReactor {
    pub fn new() -> (TcpReactor, Receiver<Notice>) {
        let (notices, receiver) = unbounded();
        (TcpReactor { notices, generation: 0 }, receiver)
    }
}

impl Reactor for TcpReactor {
    type Transport = TcpTransport;

    fn transport(&mut self) -> Result<TcpTransport> {
        self.generation += 1;
        trace!("Creating transport {}", self.generation);
        Ok(TcpTransport {
            generation: self.generation,
            input: Buffer::new(),
            output: Buffer::new(),
            notices: self.notices.clone(),
            outgoing: None,
        })
    }
}

/// Dropping the transport stops its writer, which shuts the socket down.
pub struct TcpTransport {
    generation: u64,
    input: Buffer,
    output: Buffer,
    notices: Sender<Notice>,
    outgoing: Option<Sender<Outgoing>>,
}

impl TcpTransport {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Transport for TcpTransport {
    fn input(&mut self) -> &mut Buffer {
        &mut self.input
    }

    fn output(&mut self) -> &mut Buffer {
        &mut self.output
    }

    fn connect(&mut self, addr: &str) -> Result<()> {
        let (outgoing, queue) = unbounded();
        self.outgoing = Some(outgoing);
        let addr = addr.to_owned();
        let generation = self.generation;
        let notices = self.notices.clone();
        task::spawn(async move {
            let stream = match TcpStream::connect(addr.as_str()).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!("Connecting to {} failed: {}", addr, e);
                    report(&notices, generation, Incoming::Status(EventFlags::ERROR)).await;
                    return;
                }
            };
            report(&notices, generation, Incoming::Status(EventFlags::CONNECTED)).await;
            task::spawn(read_loop(stream.clone(), generation, notices.clone()));
            write_loop(stream, queue, generation, notices).await;
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.output.is_empty() {
            return Ok(());
        }
        let data = self.output.take();
        match self.outgoing {
            Some(ref outgoing) => {
                outgoing
                    .try_send(Outgoing::Data(data))
                    .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "writer has stopped"))?;
                Ok(())
            }
            None => bail!(ErrorKind::NotConnected),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(outgoing) = self.outgoing.take() {
            let _ = outgoing.try_send(Outgoing::Shutdown);
        }
        Ok(())
    }
}

async fn report(notices: &Sender<Notice>, generation: u64, incoming: Incoming) -> bool {
    notices.send(Notice { generation, incoming }).await.is_ok()
}

async fn read_loop(mut stream: TcpStream, generation: u64, notices: Sender<Notice>) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let incoming = match stream.read(&mut buf).await {
            Ok(0) => Incoming::Status(EventFlags::EOF | EventFlags::READING),
            Ok(n) => Incoming::Data(buf[..n].to_vec()),
            Err(e) => {
                debug!("Reading failed: {}", e);
                Incoming::Status(EventFlags::ERROR | EventFlags::READING)
            }
        };
        let last = match incoming {
            Incoming::Status(_) => true,
            Incoming::Data(_) => false,
        };
        if !report(&notices, generation, incoming).await || last {
            return;
        }
    }
}

async fn write_loop(
    mut stream: TcpStream,
    queue: Receiver<Outgoing>,
    generation: u64,
    notices: Sender<Notice>,
) {
    while let Ok(outgoing) = queue.recv().await {
        match outgoing {
            Outgoing::Data(data) => {
                if let Err(e) = stream.write_all(&data).await {
                    debug!("Writing failed: {}", e);
                    let events = EventFlags::ERROR | EventFlags::WRITING;
                    report(&notices, generation, Incoming::Status(events)).await;
                    break;
                }
            }
            Outgoing::Shutdown => break,
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
}

/// Runs a client against the TCP reactor on the current task.
pub struct Driver {
    client: MemcachedClient<TcpReactor>,
    notices: Receiver<Notice>,
}

impl Driver {
    pub fn new() -> Result<Driver> {
        Driver::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Result<Driver> {
        let (reactor, notices) = TcpReactor::new();
        Ok(Driver {
            client: MemcachedClient::with_options(reactor, options)?,
            notices,
        })
    }

    pub fn client(&mut self) -> &mut MemcachedClient<TcpReactor> {
        &mut self.client
    }

    /// Waits for the next notice and hands it to the client.
    pub async fn turn(&mut self) -> Result<()> {
        let notice = match self.notices.recv().await {
            Ok(notice) => notice,
            Err(_) => bail!(ErrorKind::TransportRead("notice channel closed".to_owned())),
        };
        if notice.generation != self.client.transport().generation() {
            trace!("Dropping notice from transport {}", notice.generation);
            return Ok(());
        }
        match notice.incoming {
            Incoming::Data(data) => {
                self.client.transport_mut().input().add(&data);
                self.client.handle(Event::DataArrived);
            }
            Incoming::Status(events) => self.client.handle(Event::StatusChanged(events)),
        }
        Ok(())
    }

    /// Turns until `done` holds for the client.
    pub async fn run_until<F>(&mut self, mut done: F) -> Result<()>
    where
        F: FnMut(&MemcachedClient<TcpReactor>) -> bool,
    {
        while !done(&self.client) {
            self.turn().await?;
        }
        Ok(())
    }
}
