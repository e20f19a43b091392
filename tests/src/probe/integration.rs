#![cfg(test)]
use gkprobe_common::network::target::Target;
use gkprobe_common::outcome::{HealthStatus, Verdict};
use gkprobe_common::request::{BindSelection, ProbeRequest, TlsMaterial};
use gkprobe_core::probe::RegistrationProbe;
use gkprobe_core::signaling::TunnelSignaling;
use gkprobe_core::transport::{CipherPolicy, TlsTransport};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn loopback_request(port: u16) -> ProbeRequest {
    let bind: BindSelection = BindSelection {
        interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
        listen_port: 0,
        tls_listen_port: 0,
    };
    ProbeRequest::new(Target::new("127.0.0.1", port))
        .with_bind(bind)
        .with_timeout(Duration::from_secs(5))
}

async fn run(request: &ProbeRequest) -> Verdict {
    RegistrationProbe::new(TlsTransport::new(CipherPolicy::default()), TunnelSignaling::new())
        .run(request)
        .await
}

/// A peer that answers the ClientHello with plain text must fail the
/// secure channel, never look like a gatekeeper.
#[tokio::test]
async fn non_tls_peer_should_fail_secure_channel() -> anyhow::Result<()> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut hello: [u8; 512] = [0; 512];
            let _ = stream.read(&mut hello).await;
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            let _ = stream.read(&mut hello).await;
        }
    });

    let verdict: Verdict = run(&loopback_request(port)).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(
        verdict.reason,
        format!("Can not establish secure signalling channel with 127.0.0.1:{port}")
    );
    assert!(verdict.response_time < 5.0);
    Ok(())
}

#[tokio::test]
async fn refused_connection_should_fail_registration() -> anyhow::Result<()> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();
    drop(listener);

    let verdict: Verdict = run(&loopback_request(port)).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert!(
        verdict.reason.starts_with(&format!("Could not register with 127.0.0.1:{port}")),
        "{}",
        verdict.reason
    );
    Ok(())
}

/// The peer accepts the connection and never says a word.
#[tokio::test]
async fn silent_peer_should_time_out() -> anyhow::Result<()> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut sink: Vec<u8> = Vec::new();
        stream.read_to_end(&mut sink).await?;
        anyhow::Ok(())
    });

    let request: ProbeRequest = loopback_request(port).with_timeout(Duration::from_secs(1));
    let verdict: Verdict = run(&request).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(
        verdict.reason,
        format!("Timed out after 1s waiting for 127.0.0.1:{port} to respond")
    );
    assert!(verdict.response_time >= 1.0);

    // The probe abandons the session, so the peer sees the connection close.
    tokio::time::timeout(Duration::from_secs(5), peer).await???;
    Ok(())
}

#[tokio::test]
async fn missing_certificate_should_not_touch_the_network() -> anyhow::Result<()> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();
    let dir = tempfile::tempdir()?;

    let request: ProbeRequest = loopback_request(port).with_tls(TlsMaterial {
        certificate: Some(dir.path().join("absent.pem")),
        ..TlsMaterial::default()
    });
    let verdict: Verdict = run(&request).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(verdict.reason, "Can not load TLS certificate");
    assert_eq!(verdict.response_time, 0.0);

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "probe connected despite the missing certificate");
    Ok(())
}

#[tokio::test]
async fn unusable_ca_file_should_fail_transport() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let ca_file = dir.path().join("ca.pem");
    std::fs::write(&ca_file, "not a certificate")?;

    let request: ProbeRequest = loopback_request(1300).with_tls(TlsMaterial {
        ca_file: Some(ca_file),
        ..TlsMaterial::default()
    });
    let verdict: Verdict = run(&request).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(verdict.reason, "Can not load TLS CA file");
    Ok(())
}

#[tokio::test]
async fn busy_listen_port_should_fail_transport() -> anyhow::Result<()> {
    let busy: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let mut request: ProbeRequest = loopback_request(1300);
    request.bind.listen_port = busy.local_addr()?.port();

    let verdict: Verdict = run(&request).await;

    assert_eq!(verdict.reason, "Can not open listener");
    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    Ok(())
}

/// The listener binds before any TLS material is read, so a busy port wins
/// over a missing certificate.
#[tokio::test]
async fn busy_listen_port_should_win_over_missing_certificate() -> anyhow::Result<()> {
    let busy: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let dir = tempfile::tempdir()?;
    let mut request: ProbeRequest = loopback_request(1300).with_tls(TlsMaterial {
        certificate: Some(dir.path().join("absent.pem")),
        ..TlsMaterial::default()
    });
    request.bind.listen_port = busy.local_addr()?.port();

    let verdict: Verdict = run(&request).await;

    assert_eq!(verdict.reason, "Can not open listener");
    Ok(())
}
