#![allow(deprecated)]
use crate::constants::EventFlags;

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Utf8(::std::string::FromUtf8Error);
        Json(::serde_json::Error);
        MsgPack(::rmp_serde::decode::Error);
    }

    errors {
        UnsupportedEncoding(flags: u32) {
            description("Unsupported value encoding")
            display("Value was stored with unsupported flags {}", flags)
        }
        NotConnected {
            description("Not connected")
            display("Connection is not established")
        }
        AlreadyConnected {
            description("Already connected")
            display("Connection is already established or in progress")
        }
        TransportRead(reason: String) {
            description("Failed reading from transport")
            display("Failed reading from transport: {}", reason)
        }
        Connection(events: EventFlags) {
            description("Connection failure")
            display("Connection failed with events {:?}", events)
        }
        KeyLengthTooLong(length: usize) {
            description("The provided key is too long")
            display("The key length {} is greater than the allowed maximum", length)
        }
        InvalidKey(key: String) {
            description("The provided key is invalid")
            display("Key {:?} is empty or contains whitespace or control characters", key)
        }
        MalformedHeader(line: String) {
            description("Malformed response header")
            display("Server sent a malformed response header {:?}", line)
        }
        ProtocolDesync(expected: String, found: String) {
            description("Response does not match the request")
            display("Expected a value for {:?} but server answered for {:?}", expected, found)
        }
    }
}
