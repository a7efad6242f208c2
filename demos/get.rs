/*!
Fetches the keys given on the command line from a local memcached and prints them, decoded
into a typed struct when they look like one.
*/
use std::cell::RefCell;
use std::env;
use std::rc::Rc;

use async_std::task;
use serde_derive::Deserialize;

use evmemcached::net::Driver;
use evmemcached::{ConnectionState, Reply};

#[derive(Debug, Deserialize)]
struct Data {
    name: String,
    age: u8,
    registered: bool,
}

fn main() {
    let _ = env_logger::try_init();
    let keys: Vec<String> = env::args().skip(1).collect();
    task::block_on(async {
        let mut driver = Driver::new().unwrap();
        driver
            .client()
            .on_error(|events| println!("Connection error {:?}", events));
        driver
            .client()
            .connect("127.0.0.1:11211", |events| println!("Connect finished with {:?}", events))
            .unwrap();
        driver
            .run_until(|client| client.state() != ConnectionState::Connecting)
            .await
            .unwrap();
        if !driver.client().is_connected() {
            return;
        }

        let replies = Rc::new(RefCell::new(Vec::new()));
        for key in &keys {
            let replies = replies.clone();
            driver
                .client()
                .get(key, move |key: &str, reply: Reply| {
                    replies.borrow_mut().push((key.to_owned(), reply))
                })
                .unwrap();
        }
        driver.run_until(|client| client.pending() == 0).await.unwrap();

        for (key, reply) in replies.borrow_mut().drain(..) {
            println!("Raw {}: {:?}", key, reply.value());
            match reply.into_typed::<Data>() {
                Ok(Some(data)) => println!("Parsed {}: {:?}", key, data),
                Ok(None) => println!("{} not found", key),
                Err(e) => println!("{} is not Data: {}", key, e),
            }
        }
        driver.client().close().unwrap();
    });
}
