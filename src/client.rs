use std::collections::VecDeque;
use std::mem;

use serde::de::DeserializeOwned;

use crate::codec::Value;
use crate::constants::{EventFlags, KEY_MAXIMUM_SIZE, RESPONSE_MAXIMUM_SIZE};
use crate::errors::{Error, ErrorKind, Result};
use crate::protocol::{self, Response};
use crate::reader::StreamReader;
use crate::transport::{Event, Reactor, Transport};

/// Callbacks run inside `MemcachedClient::handle` and must not re-enter the client.
pub type GetCallback = Box<dyn FnMut(&str, Reply)>;
pub type ConnectCallback = Box<dyn FnOnce(EventFlags)>;
pub type ErrorCallback = Box<dyn FnMut(EventFlags)>;

/// Outcome handed to a `get` callback.
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    /// The server has no value for the key.
    NotFound,
    /// A value arrived but could not be decoded, or it answered another key.
    Failed(Error),
    /// The connection went away before the response arrived.
    ConnectionLost,
}

impl Reply {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Reply::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Reply::NotFound => true,
            _ => false,
        }
    }

    /// Deserializes a delivered value into `T`; `Ok(None)` for a missing key.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Option<T>> {
        match self {
            Reply::Value(value) => Ok(Some(serde_json::from_value(value)?)),
            Reply::NotFound => Ok(None),
            Reply::Failed(e) => Err(e),
            Reply::ConnectionLost => bail!(ErrorKind::NotConnected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub key_maximum_size: usize,
    /// Largest response transcript accepted before the connection is dropped.
    pub response_maximum_size: usize,
    /// Fail a reply whose key differs from the one requested.
    pub verify_keys: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            key_maximum_size: KEY_MAXIMUM_SIZE,
            response_maximum_size: RESPONSE_MAXIMUM_SIZE,
            verify_keys: true,
        }
    }
}

struct PendingRequest {
    key: String,
    callback: GetCallback,
}

/// Memcached text protocol client driven by reactor notifications.
///
/// Requests are pipelined: every `get` is written immediately and its
/// callback queued. Memcached answers in request order, so each complete
/// response belongs to the oldest queued request.
pub struct MemcachedClient<R: Reactor> {
    reactor: R,
    transport: R::Transport,
    state: ConnectionState,
    reader: StreamReader,
    pending: VecDeque<PendingRequest>,
    on_connect: Option<ConnectCallback>,
    on_error: Option<ErrorCallback>,
    options: Options,
}

impl<R: Reactor> MemcachedClient<R> {
    pub fn new(reactor: R) -> Result<MemcachedClient<R>> {
        MemcachedClient::with_options(reactor, Options::default())
    }

    pub fn with_options(mut reactor: R, options: Options) -> Result<MemcachedClient<R>> {
        let transport = reactor.transport()?;
        Ok(MemcachedClient {
            reactor,
            transport,
            state: ConnectionState::Disconnected,
            reader: StreamReader::new(options.response_maximum_size),
            pending: VecDeque::new(),
            on_connect: None,
            on_error: None,
            options,
        })
    }

    /// Starts connecting to `addr`, which is handed to the transport as is.
    /// `callback` runs once, with the flags of the next status change.
    ///
    /// Callbacks run while the client is borrowed for the event being
    /// handled, so they cannot call back into it. Work that needs the client,
    /// such as a follow-up `get`, has to be recorded and issued after
    /// `handle` returns.
    pub fn connect<F>(&mut self, addr: &str, callback: F) -> Result<()>
    where
        F: FnOnce(EventFlags) + 'static,
    {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                bail!(ErrorKind::AlreadyConnected)
            }
            ConnectionState::Disconnected | ConnectionState::Errored => {}
        }
        debug!("Connecting to {}", addr);
        self.reader.clear();
        self.transport.connect(addr)?;
        self.on_connect = Some(Box::new(callback));
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Registers the callback run on every connection error.
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(EventFlags) + 'static,
    {
        self.on_error = Some(Box::new(callback));
    }

    /// Requests `key`. `callback` runs once per value found, or once with
    /// `Reply::NotFound` when there is none.
    ///
    /// As with `connect`, the callback cannot reach the client: queue any
    /// follow-up request and send it once `handle` has returned.
    pub fn get<F>(&mut self, key: &str, callback: F) -> Result<()>
    where
        F: FnMut(&str, Reply) + 'static,
    {
        if self.state != ConnectionState::Connected {
            bail!(ErrorKind::NotConnected);
        }
        protocol::check_key(key, self.options.key_maximum_size)?;
        self.transport.output().add(&protocol::build_get(key));
        self.transport.flush()?;
        self.pending.push_back(PendingRequest {
            key: key.to_owned(),
            callback: Box::new(callback),
        });
        trace!("Sent get {:?}, {} pending", key, self.pending.len());
        Ok(())
    }

    /// Marks the client disconnected right away and shuts the transport down.
    /// Requests still waiting get `Reply::ConnectionLost`.
    pub fn close(&mut self) -> Result<()> {
        debug!("Closing connection");
        self.state = ConnectionState::Disconnected;
        self.on_connect = None;
        let closed = self.transport.close();
        self.reader.clear();
        self.flush_pending();
        self.renew_transport()?;
        closed
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::DataArrived => self.on_data_arrived(),
            Event::DataSent => {}
            Event::StatusChanged(events) => self.on_status_changed(events),
        }
    }

    pub fn on_data_arrived(&mut self) {
        loop {
            match self.reader.read(self.transport.input()) {
                Ok(true) => self.dispatch(),
                Ok(false) => return,
                Err(e) => {
                    error!("Dropping connection: {}", e);
                    let events = EventFlags::ERROR | EventFlags::READING;
                    self.teardown(events);
                    self.notify(events);
                    return;
                }
            }
        }
    }

    pub fn on_status_changed(&mut self, events: EventFlags) {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Errored => {
                debug!("Ignoring status {:?} while {:?}", events, self.state);
                return;
            }
            ConnectionState::Connecting | ConnectionState::Connected => {}
        }
        if events.contains(EventFlags::CONNECTED) {
            if self.state == ConnectionState::Connecting {
                debug!("Connected");
                self.state = ConnectionState::Connected;
                self.reader.clear();
            }
        } else {
            self.teardown(events);
        }
        self.notify(events);
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Number of requests waiting for their response.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn transport(&self) -> &R::Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut R::Transport {
        &mut self.transport
    }

    fn dispatch(&mut self) {
        let records: Vec<Result<Response>> = protocol::parse(self.reader.response()).collect();
        self.reader.clear();

        let mut request = match self.pending.pop_front() {
            Some(request) => request,
            None => {
                warn!("Dropping response with {} values, nothing was requested", records.len());
                return;
            }
        };
        trace!("Response for {:?} with {} values", request.key, records.len());

        if records.is_empty() {
            (request.callback)(&request.key, Reply::NotFound);
            return;
        }
        for record in records {
            let reply = match record {
                Ok(ref response) if self.options.verify_keys && response.key != request.key => {
                    error!("Expected {:?}, server answered {:?}", request.key, response.key);
                    let kind = ErrorKind::ProtocolDesync(request.key.clone(), response.key.clone());
                    Reply::Failed(kind.into())
                }
                Ok(response) => Reply::Value(response.value),
                Err(e) => {
                    error!("Could not read value for {:?}: {}", request.key, e);
                    Reply::Failed(e)
                }
            };
            (request.callback)(&request.key, reply);
        }
    }

    fn teardown(&mut self, events: EventFlags) {
        if events.contains(EventFlags::ERROR) {
            warn!("Connection failed with {:?}", events);
            self.state = ConnectionState::Errored;
        } else {
            debug!("Connection closed with {:?}", events);
            self.state = ConnectionState::Disconnected;
        }
        if let Err(e) = self.transport.close() {
            debug!("Closing failed transport: {}", e);
        }
        if let Err(e) = self.renew_transport() {
            error!("Could not create a new transport: {}", e);
        }
        self.reader.clear();
        self.flush_pending();
    }

    fn notify(&mut self, events: EventFlags) {
        if let Some(callback) = self.on_connect.take() {
            callback(events);
        }
        if events.contains(EventFlags::ERROR) {
            if let Some(callback) = self.on_error.as_mut() {
                callback(events);
            }
        }
    }

    fn renew_transport(&mut self) -> Result<()> {
        let transport = self.reactor.transport()?;
        drop(mem::replace(&mut self.transport, transport));
        Ok(())
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            warn!("Failing {} requests left without response", self.pending.len());
        }
        for mut request in self.pending.drain(..) {
            (request.callback)(&request.key, Reply::ConnectionLost);
        }
    }
}
