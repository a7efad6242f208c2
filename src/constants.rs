/// Longest key memcached accepts.
pub const KEY_MAXIMUM_SIZE: usize = 250;

/// Upper bound for one accumulated response transcript.
pub const RESPONSE_MAXIMUM_SIZE: usize = 8 * 1024 * 1024;

pub const CRLF: &[u8] = b"\r\n";
pub const END: &[u8] = b"END";
pub const VALUE: &[u8] = b"VALUE";
pub const GET: &str = "get";

bitflags! {
    /// Status bits carried by a status-changed notification. The values match
    /// the ones libevent uses for buffer events.
    pub struct EventFlags: u16 {
        const READING = 0x01;
        const WRITING = 0x02;
        const EOF = 0x10;
        const ERROR = 0x20;
        const TIMEOUT = 0x40;
        const CONNECTED = 0x80;
    }
}

enum_from_primitive! {
    /// Codec a stored value was written with, as announced by its flags.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Encoding {
        Compressed = 0,
        Serialized = 4,
        MsgPack = 5
    }
}
