//! tests against a real main board on `/dev/ttyACM0`, run them with `cargo test -- --ignored`

use std::{
    sync::Arc,
    time::Duration,
    };
use futures_concurrency::future::Join;
use serial_test::serial;

use leaflink::{
    client::*,
    registers::{self, Register},
    };


fn test<T, F>(test: T)
where
    T: FnOnce(Arc<Client>) -> F,
    F: Future,
{
    let _ = env_logger::builder().is_test(true).try_init();
    tokio::runtime::Runtime::new()
    .expect("failed to create runtime")
    .block_on(async move {
        let client = Arc::new(Client::open(&LinkConfig::default()).expect("failed to open serial port"));
        tokio::time::timeout(Duration::from_secs(30), test(client))
        .await.expect("aborted test because took too long");
    });
}

/// unit address of the main board
const MAIN_BOARD: u8 = 0;

#[test]
#[ignore]
#[serial]
fn system_registers() {
    test(|client| async move {
        let mut version = Register::new(registers::system::FW_VERSION);
        client.read(MAIN_BOARD, &mut version, Timeouts::default()).await.unwrap();

        let mut address = Register::new(registers::system::ADDR);
        client.read(MAIN_BOARD, &mut address, Timeouts::default()).await.unwrap();
        assert_eq!(address.value(), i64::from(MAIN_BOARD));
    });
}

#[test]
#[ignore]
#[serial]
fn write_while_reading() {
    test(|client| async move {
        let mut duty = Register::with_value(registers::system::PWM_15_DUTY_CYCLE, 500).unwrap();
        client.write(MAIN_BOARD, &duty, Timeouts::default()).await.unwrap();

        let (written, status) = (
            async {
                let duty = Register::with_value(registers::system::PWM_15_DUTY_CYCLE, 250).unwrap();
                client.write(MAIN_BOARD, &duty, Timeouts::default()).await
            },
            async {
                let mut status = Register::new(registers::system::GLOBAL_STATUS);
                client.read(MAIN_BOARD, &mut status, Timeouts::default()).await
            },
        ).join().await;
        written.unwrap();
        status.unwrap();

        assert_eq!(client.read(MAIN_BOARD, &mut duty, Timeouts::default()).await.unwrap(), 250);
    });
}
