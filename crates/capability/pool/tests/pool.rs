use devsim_config::DeviceFile;
use devsim_pool::{DevicePool, PoolError, PoolOptions};
use devsim_protocol::DeviceRegistry;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn local_options(number: usize, portfile: Option<&Path>) -> PoolOptions {
    PoolOptions {
        number,
        portfile: portfile.map(Path::to_path_buf),
        bind_host: "127.0.0.1".to_string(),
        ..PoolOptions::default()
    }
}

async fn ask(addr: SocketAddr, line: &str) -> String {
    let stream = TcpStream::connect(addr).await.expect("connect");
    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(format!("{}\n", line).as_bytes())
        .await
        .expect("write");
    let mut reply = String::new();
    timeout(Duration::from_secs(5), BufReader::new(reader).read_line(&mut reply))
        .await
        .expect("reply in time")
        .expect("read");
    reply.trim_end().to_string()
}

#[test]
fn builds_defaults_before_configured_devices() {
    let registry = DeviceRegistry::new();
    let file = DeviceFile::from_yaml_str(
        "Devices:\n  pump:\n    Params:\n      flow: { type: i, init: 4 }\n  valve: {}\n",
    )
    .unwrap();

    let pool = DevicePool::build(&registry, &local_options(2, None), Some(&file));
    assert_eq!(pool.names(), vec!["DeviceSim0", "DeviceSim1", "pump0", "valve0"]);
    assert!(pool.failures().is_empty());
    assert_eq!(registry.len(), 4);
}

#[test]
fn bad_entries_fail_alone() {
    let registry = DeviceRegistry::new();
    let file = DeviceFile::from_yaml_str(
        "Devices:\n  broken:\n    source: /nonexistent/params.yaml\n  clash:\n    Params:\n      x: { type: b, init: maybe }\n  fine: {}\n",
    )
    .unwrap();

    let pool = DevicePool::build(&registry, &local_options(0, None), Some(&file));
    assert_eq!(pool.names(), vec!["fine0"]);

    let failed: Vec<&str> = pool.failures().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["broken", "clash"]);
    assert!(matches!(pool.failures()[0].error, PoolError::Config(_)));
    assert!(matches!(pool.failures()[1].error, PoolError::Device(_)));
    assert!(!registry.contains("clash0"));
}

#[tokio::test]
async fn started_devices_serve_and_publish_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let registry = DeviceRegistry::new();
    let file = DeviceFile::from_yaml_str(
        "Devices:\n  meter:\n    Params:\n      label: { type: s, init: north }\n",
    )
    .unwrap();

    let pool = DevicePool::build(&registry, &local_options(1, Some(dir.path())), Some(&file))
        .start()
        .await;
    assert_eq!(pool.devices().len(), 2);
    assert!(pool.failures().is_empty());

    let meter = pool.device("meter0").expect("meter running");
    let published = std::fs::read_to_string(dir.path().join("meter0.port")).unwrap();
    assert_eq!(published, meter.local_addr().to_string());
    assert!(dir.path().join("DeviceSim0.port").exists());

    assert_eq!(ask(meter.local_addr(), "R:label:").await, "R:label:north");
    let default = pool.device("DeviceSim0").unwrap().local_addr();
    assert_eq!(ask(default, "R:D:").await, "R:D:mystring");

    pool.shutdown();
    assert!(!dir.path().join("meter0.port").exists());
    assert!(!dir.path().join("DeviceSim0.port").exists());
}

#[tokio::test]
async fn missing_address_directory_stops_only_that_device() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        "Devices:\n  lost:\n    portfile: {}\n  kept: {{}}\n",
        dir.path().join("missing").display()
    );
    let file = DeviceFile::from_yaml_str(&yaml).unwrap();
    let registry = DeviceRegistry::new();

    let pool = DevicePool::build(&registry, &local_options(0, Some(dir.path())), Some(&file))
        .start()
        .await;

    let running: Vec<&str> = pool.devices().iter().map(|d| d.name()).collect();
    assert_eq!(running, vec!["kept0"]);
    assert_eq!(pool.failures().len(), 1);
    assert_eq!(pool.failures()[0].name, "lost0");
    assert!(matches!(pool.failures()[0].error, PoolError::AddressDir(_)));
    assert!(dir.path().join("kept0.port").exists());

    drop(pool);
    assert!(!dir.path().join("kept0.port").exists());
}
