#![cfg(feature = "hardware")]

use lcr_hardware::{HwError, SerialLink};

#[test]
fn opening_a_missing_port_is_a_serial_error() {
    let err = SerialLink::open("/dev/lcr-does-not-exist", 9600)
        .err()
        .expect("port should not open");
    match err {
        HwError::Serial(msg) => assert!(msg.contains("/dev/lcr-does-not-exist")),
        other => panic!("unexpected error: {other:?}"),
    }
}
