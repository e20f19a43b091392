#![cfg(test)]
use gkprobe_common::network::target::Target;
use gkprobe_common::outcome::{HealthStatus, Verdict};
use gkprobe_common::request::{BindSelection, ProbeRequest, TlsMaterial};
use gkprobe_core::probe::RegistrationProbe;
use gkprobe_core::signaling::ras::{self, RasReply};
use gkprobe_core::signaling::{TunnelSignaling, q931, tpkt};
use gkprobe_core::transport::{CipherPolicy, TlsTransport};
use rustls::server::AllowAnyAuthenticatedClient;
use rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use secrecy::SecretString;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

const PASSPHRASE: &str = "gkprobe-test";

const GATEKEEPER_CONFIRM: u8 = 1;
const GATEKEEPER_REJECT: u8 = 2;
const REGISTRATION_CONFIRM: u8 = 4;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

fn certificates(name: &str) -> anyhow::Result<Vec<Certificate>> {
    let mut reader = BufReader::new(std::fs::File::open(fixture(name))?);
    Ok(rustls_pemfile::certs(&mut reader)?.into_iter().map(Certificate).collect())
}

fn gatekeeper_key() -> anyhow::Result<PrivateKey> {
    let mut reader = BufReader::new(std::fs::File::open(fixture("gatekeeper.key"))?);
    let mut keys: Vec<Vec<u8>> = rustls_pemfile::pkcs8_private_keys(&mut reader)?;
    anyhow::ensure!(!keys.is_empty(), "gatekeeper.key holds no PKCS#8 key");
    Ok(PrivateKey(keys.remove(0)))
}

fn server_config(require_client_cert: bool) -> anyhow::Result<ServerConfig> {
    let builder = ServerConfig::builder().with_safe_defaults();
    let builder = if require_client_cert {
        let mut roots: RootCertStore = RootCertStore::empty();
        for ca in certificates("ca.pem")? {
            roots
                .add(&ca)
                .map_err(|e| anyhow::anyhow!("test CA rejected: {e:?}"))?;
        }
        builder.with_client_cert_verifier(Arc::new(AllowAnyAuthenticatedClient::new(roots)))
    } else {
        builder.with_no_client_auth()
    };
    Ok(builder.with_single_cert(certificates("gatekeeper.pem")?, gatekeeper_key()?)?)
}

/// Accepts one TLS connection, checks that a tunnelled GatekeeperRequest
/// arrives and answers with the RAS message `reply`, echoing the sequence
/// number. Resolves to whether the client presented a certificate.
async fn spawn_gatekeeper(
    config: ServerConfig,
    reply: u8,
) -> anyhow::Result<(u16, JoinHandle<anyhow::Result<bool>>)> {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await?;
    let port: u16 = listener.local_addr()?.port();
    let acceptor: TlsAcceptor = TlsAcceptor::from(Arc::new(config));

    let session = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut tls = acceptor.accept(stream).await?;
        let client_authenticated: bool = tls.get_ref().1.peer_certificates().is_some();

        let frame: Vec<u8> = tpkt::read_frame(&mut tls).await?;
        let request: Vec<u8> = q931::unwrap_ras(&frame)?
            .ok_or_else(|| anyhow::anyhow!("Facility without tunnelled RAS"))?;
        anyhow::ensure!(ras::classify(&request)? == RasReply::Other(0), "not a GRQ");

        let answer: Vec<u8> = q931::wrap_ras(&[reply << 2, 0x00, request[2], request[3]])?;
        tls.write_all(&tpkt::encode_frame(&answer)?).await?;
        tls.flush().await?;
        anyhow::Ok(client_authenticated)
    });
    Ok((port, session))
}

fn request(port: u16, tls: TlsMaterial) -> ProbeRequest {
    let bind: BindSelection = BindSelection {
        interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
        listen_port: 0,
        tls_listen_port: 0,
    };
    ProbeRequest::new(Target::new("127.0.0.1", port))
        .with_bind(bind)
        .with_tls(tls)
        .with_timeout(Duration::from_secs(5))
}

fn trusting_ca() -> TlsMaterial {
    TlsMaterial {
        ca_file: Some(fixture("ca.pem")),
        ..TlsMaterial::default()
    }
}

fn client_identity(passphrase: &str) -> TlsMaterial {
    TlsMaterial {
        ca_file: Some(fixture("ca.pem")),
        certificate: Some(fixture("client.pem")),
        private_key: Some(fixture("client-encrypted.key")),
        passphrase: Some(SecretString::new(passphrase.to_string())),
    }
}

async fn run(request: &ProbeRequest) -> Verdict {
    RegistrationProbe::new(TlsTransport::new(CipherPolicy::default()), TunnelSignaling::new())
        .run(request)
        .await
}

#[tokio::test]
async fn gatekeeper_confirm_should_be_healthy() -> anyhow::Result<()> {
    let (port, gatekeeper) = spawn_gatekeeper(server_config(false)?, GATEKEEPER_CONFIRM).await?;

    let verdict: Verdict = run(&request(port, trusting_ca())).await;

    assert_eq!(verdict.status, HealthStatus::Healthy);
    assert_eq!(verdict.reason, format!("GatekeeperConfirm from 127.0.0.1:{port}"));
    assert!(verdict.response_time < 5.0);
    assert!(!gatekeeper.await??);
    Ok(())
}

#[tokio::test]
async fn gatekeeper_reject_should_stay_healthy() -> anyhow::Result<()> {
    let (port, gatekeeper) = spawn_gatekeeper(server_config(false)?, GATEKEEPER_REJECT).await?;

    let verdict: Verdict = run(&request(port, trusting_ca())).await;

    assert_eq!(verdict.status, HealthStatus::Healthy);
    assert_eq!(verdict.reason, format!("GatekeeperReject from 127.0.0.1:{port}"));
    gatekeeper.await??;
    Ok(())
}

#[tokio::test]
async fn encrypted_client_key_should_authenticate() -> anyhow::Result<()> {
    let (port, gatekeeper) = spawn_gatekeeper(server_config(true)?, REGISTRATION_CONFIRM).await?;

    let verdict: Verdict = run(&request(port, client_identity(PASSPHRASE))).await;

    assert_eq!(verdict.status, HealthStatus::Healthy);
    assert_eq!(verdict.reason, format!("Registered with 127.0.0.1:{port}"));
    assert!(gatekeeper.await??, "client certificate was not presented");
    Ok(())
}

#[tokio::test]
async fn wrong_passphrase_should_fail_before_connecting() -> anyhow::Result<()> {
    let (port, gatekeeper) = spawn_gatekeeper(server_config(true)?, REGISTRATION_CONFIRM).await?;

    let verdict: Verdict = run(&request(port, client_identity("not-the-passphrase"))).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(verdict.reason, "Can not load TLS private key");
    assert_eq!(verdict.response_time, 0.0);
    assert!(!gatekeeper.is_finished());
    gatekeeper.abort();
    Ok(())
}

/// Without a CA file only the bundled public roots are trusted, which the
/// test CA is not part of.
#[tokio::test]
async fn untrusted_gatekeeper_should_fail_secure_channel() -> anyhow::Result<()> {
    let (port, gatekeeper) = spawn_gatekeeper(server_config(false)?, GATEKEEPER_CONFIRM).await?;

    let verdict: Verdict = run(&request(port, TlsMaterial::default())).await;

    assert_eq!(verdict.status, HealthStatus::Unhealthy);
    assert_eq!(
        verdict.reason,
        format!("Can not establish secure signalling channel with 127.0.0.1:{port}")
    );
    assert!(gatekeeper.await?.is_err());
    Ok(())
}
