use super::*;

#[tokio::test]
async fn test_server_answers_registered_name() -> Result<()> {
    let name = "loon-test-3c1a9f.local";

    let server = DnsConn::server(Config {
        local_names: vec![name.to_owned()],
        local_address: Some("127.0.0.1".parse().unwrap()),
        ..Default::default()
    })?;

    let resolver = DnsConn::server(Config::default())?;

    let (answer, addr) = resolver
        .query(name, Duration::from_secs(4))
        .await?;
    assert_eq!(answer, format!("{name}."));
    assert_eq!(addr, "127.0.0.1".parse::<IpAddr>().unwrap());

    server.close().await;
    resolver.close().await;
    Ok(())
}

#[tokio::test]
async fn test_query_unknown_name_times_out() -> Result<()> {
    let resolver = DnsConn::server(Config::default())?;
    let result = resolver
        .query("does-not-exist-1b2c3d.local", Duration::from_millis(300))
        .await;
    assert_eq!(result.err(), Some(Error::ErrContextElapsed));
    resolver.close().await;
    Ok(())
}
