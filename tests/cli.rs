#![cfg(feature = "full")]

use std::{fs, process::Stdio, time::Duration};

use deadline::deadline;
use murmur::message::NeighborStatus;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

mod common;
#[allow(unused_imports)]
use crate::common::{enable_tracing, start_node, unreachable_key};

#[tokio::test(flavor = "multi_thread")]
async fn menu_survives_failed_command_and_says_bye() {
    let peer = start_node().await;
    let node_key = unreachable_key();

    let dir = tempfile::tempdir().unwrap();
    let seeds = dir.path().join("neighbors.txt");
    fs::write(&seeds, format!("{}\n", peer.local_key())).unwrap();
    let shared = dir.path().join("shared");
    fs::create_dir(&shared).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_murmur"))
        .arg(node_key.to_string())
        .arg(&seeds)
        .arg(&shared)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();

    // Say HELLO to the only seed, which marks it online on the node's side.
    stdin.write_all(b"1\n1\n").await.unwrap();
    let peer_c = peer.clone();
    let key = node_key.clone();
    deadline!(Duration::from_secs(5), move || peer_c.neighbors().get(&key)
        == Some(NeighborStatus::Online));

    // Listing the shared directory now fails, the menu keeps going.
    fs::remove_dir(&shared).unwrap();
    stdin.write_all(b"3\n").await.unwrap();

    // End of input leaves the overlay.
    drop(stdin);

    let peer_c = peer.clone();
    let key = node_key.clone();
    deadline!(Duration::from_secs(5), move || peer_c.neighbors().get(&key)
        == Some(NeighborStatus::Offline));

    let output = timeout(Duration::from_secs(5), child.wait_with_output())
        .await
        .unwrap()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    // Output following a prompt lands on the prompt's line.
    assert!(stdout.contains("> Peer list:"), "{stdout}");
    assert!(stdout.ends_with("Leaving...\n"), "{stdout}");
}
