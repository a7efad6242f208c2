/*!
Client for the memcached text protocol, driven by reactor notifications. Requests are
pipelined over one connection and answered through callbacks in the order they were sent.
Stored values are decoded by a codec chosen from the flags memcached hands back.
# Example
```rust,no_run
use std::cell::RefCell;
use std::rc::Rc;

use evmemcached::net::Driver;
use evmemcached::{ConnectionState, EventFlags, Reply};

#[async_std::main]
async fn main() -> evmemcached::errors::Result<()> {
    let mut driver = Driver::new()?;
    driver.client().connect("127.0.0.1:11211", |events| {
        if events.contains(EventFlags::ERROR) {
            println!("Could not connect");
        }
    })?;
    driver
        .run_until(|client| client.state() != ConnectionState::Connecting)
        .await?;

    let value = Rc::new(RefCell::new(None));
    let slot = value.clone();
    driver.client().get("string", move |_, reply: Reply| {
        *slot.borrow_mut() = Some(reply);
    })?;
    driver.run_until(|client| client.pending() == 0).await?;
    println!("{:?}", value.borrow());
    driver.client().close()
}
```
*/
#![forbid(unsafe_code)]
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate enum_primitive;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

pub mod buffer;
mod client;
pub mod codec;
pub mod constants;
pub mod errors;
pub mod net;
pub mod protocol;
pub mod reader;
pub mod transport;

pub use client::{ConnectionState, MemcachedClient, Options, Reply};
pub use codec::Value;
pub use constants::{Encoding, EventFlags};
pub use protocol::Response;
pub use transport::{Event, Reactor, Transport};
