//! End-to-end scenarios driven through the public client API over real
//! FIFOs.

use fifofs_client::{ClientError, FsClient};
use fifofs_proto::OpenFlags;

use crate::harness::TestServer;

fn create() -> OpenFlags {
    OpenFlags {
        create: true,
        ..OpenFlags::empty()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mount_write_read_round_trip() {
    let server = TestServer::start(4).await;

    let mut client = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();

    let handle = client.open("notes.txt", create()).await.unwrap();
    assert_eq!(client.write(handle, b"hello").await.unwrap(), 5);

    // A fresh handle reads from offset zero.
    let h2 = client.open("notes.txt", OpenFlags::empty()).await.unwrap();
    assert_eq!(client.read(h2, 64).await.unwrap(), b"hello");

    client.close(handle).await.unwrap();
    client.close(h2).await.unwrap();
    client.unmount().await.unwrap();

    assert_eq!(server.engine().open_handles(), 0);
    assert_eq!(server.engine().file_count(), 1);
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_read_of_fresh_file_is_empty() {
    let server = TestServer::start(1).await;

    let mut client = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();
    let handle = client.open("empty", create()).await.unwrap();
    assert!(client.read(handle, 128).await.unwrap().is_empty());
    client.close(handle).await.unwrap();
    client.unmount().await.unwrap();
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_payload_bytes_survive_round_trip() {
    let server = TestServer::start(1).await;

    let mut client = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();
    let handle = client.open("blob", create()).await.unwrap();
    let data = [0u8, 1, 0, 255, 42];
    assert_eq!(client.write(handle, &data).await.unwrap(), data.len());

    let h2 = client.open("blob", OpenFlags::empty()).await.unwrap();
    assert_eq!(client.read(h2, 16).await.unwrap(), data);

    client.close(handle).await.unwrap();
    client.close(h2).await.unwrap();
    client.unmount().await.unwrap();
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slot_reused_after_unmount() {
    let server = TestServer::start(1).await;

    let client = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();
    let first = client.session();
    client.unmount().await.unwrap();

    let client = FsClient::mount(server.pipe_path(), &server.client_path("c1"))
        .await
        .unwrap();
    assert_eq!(client.session(), first);
    client.unmount().await.unwrap();
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_clients_get_distinct_sessions() {
    let server = TestServer::start(4).await;

    let mut a = FsClient::mount(server.pipe_path(), &server.client_path("a"))
        .await
        .unwrap();
    let mut b = FsClient::mount(server.pipe_path(), &server.client_path("b"))
        .await
        .unwrap();
    assert_ne!(a.session(), b.session());

    // Each session works against its own file; neither disturbs the other.
    let ha = a.open("a.dat", create()).await.unwrap();
    let hb = b.open("b.dat", create()).await.unwrap();
    a.write(ha, b"alpha").await.unwrap();
    b.write(hb, b"bravo").await.unwrap();
    a.close(ha).await.unwrap();
    b.close(hb).await.unwrap();

    let ha = a.open("a.dat", OpenFlags::empty()).await.unwrap();
    let hb = b.open("b.dat", OpenFlags::empty()).await.unwrap();
    assert_eq!(a.read(ha, 16).await.unwrap(), b"alpha");
    assert_eq!(b.read(hb, 16).await.unwrap(), b"bravo");
    a.close(ha).await.unwrap();
    b.close(hb).await.unwrap();

    a.unmount().await.unwrap();
    b.unmount().await.unwrap();
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mount_rejected_when_table_full() {
    let server = TestServer::start(1).await;

    let first = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();

    let err = FsClient::mount(server.pipe_path(), &server.client_path("c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MountRejected));

    // The slot frees on unmount and the next mount succeeds.
    first.unmount().await.unwrap();
    let second = FsClient::mount(server.pipe_path(), &server.client_path("c2"))
        .await
        .unwrap();
    second.unmount().await.unwrap();
    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_refused_while_handle_open() {
    let server = TestServer::start(2).await;

    let mut client = FsClient::mount(server.pipe_path(), &server.client_path("c0"))
        .await
        .unwrap();
    let handle = client.open("pinned", create()).await.unwrap();

    let err = client.shutdown().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Rejected {
            op: fifofs_proto::OpCode::Shutdown
        }
    ));

    client.close(handle).await.unwrap();
    client.shutdown().await.unwrap();

    // A successful shutdown stops the whole server.
    server.join().await;
}
