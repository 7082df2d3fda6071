use std::time::Duration;

use util::Conn;

use super::agent_config::AgentConfig;
use super::*;
use crate::state::ConnectionState;

async fn new_local_agent() -> Result<Arc<Agent>> {
    Agent::new(AgentConfig {
        include_loopback: true,
        urls: vec![],
        ..Default::default()
    })
    .await
}

/// Wires two agents together over localhost: credentials, candidates,
/// and connectivity in both roles.
async fn connect_pair() -> Result<(Arc<Agent>, Arc<Agent>)> {
    let a = new_local_agent().await?;
    let b = new_local_agent().await?;

    let (a_ufrag, a_pwd) = a.get_local_user_credentials().await;
    let (b_ufrag, b_pwd) = b.get_local_user_credentials().await;
    a.set_remote_credentials(b_ufrag, b_pwd).await?;
    b.set_remote_credentials(a_ufrag, a_pwd).await?;

    a.gather_candidates().await?;
    b.gather_candidates().await?;

    // candidate exchange via the trickle channel string form
    tokio::time::sleep(Duration::from_millis(200)).await;
    for c in a.get_local_candidates().await {
        let parsed = Arc::new(crate::candidate::Candidate::unmarshal(&c.marshal())?);
        b.add_remote_candidate(parsed).await?;
    }
    for c in b.get_local_candidates().await {
        let parsed = Arc::new(crate::candidate::Candidate::unmarshal(&c.marshal())?);
        a.add_remote_candidate(parsed).await?;
    }

    a.start_connectivity(true).await?;
    b.start_connectivity(false).await?;

    for _ in 0..400 {
        let sa = a.connection_state().await;
        let sb = b.connection_state().await;
        if (sa == ConnectionState::Connected || sa == ConnectionState::Completed)
            && (sb == ConnectionState::Connected || sb == ConnectionState::Completed)
        {
            return Ok((a, b));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(Error::Other("agents failed to connect".to_owned()))
}

#[tokio::test]
async fn test_agents_connect_on_loopback() -> Result<()> {
    let (a, b) = connect_pair().await?;

    assert!(a.get_selected_candidate_pair().await.is_some());

    a.close().await?;
    b.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_data_flows_through_selected_pair() -> Result<()> {
    let (a, b) = connect_pair().await?;

    let conn_a = a.get_conn();
    let conn_b = b.get_conn();

    conn_a.send(b"ping over ice").await?;
    let mut buf = [0u8; 64];
    let n = conn_b.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"ping over ice");

    conn_b.send(b"pong over ice").await?;
    let n = conn_a.recv(&mut buf).await?;
    assert_eq!(&buf[..n], b"pong over ice");

    a.close().await?;
    b.close().await?;
    Ok(())
}

/// Both agents believe they are controlling; the 487 exchange and the
/// tie-breaker comparison must leave exactly one of them controlling
/// and still produce a working pair.
#[tokio::test]
async fn test_role_conflict_resolves() -> Result<()> {
    let a = new_local_agent().await?;
    let b = new_local_agent().await?;

    let (a_ufrag, a_pwd) = a.get_local_user_credentials().await;
    let (b_ufrag, b_pwd) = b.get_local_user_credentials().await;
    a.set_remote_credentials(b_ufrag, b_pwd).await?;
    b.set_remote_credentials(a_ufrag, a_pwd).await?;

    a.gather_candidates().await?;
    b.gather_candidates().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    for c in a.get_local_candidates().await {
        b.add_remote_candidate(Arc::new(crate::candidate::Candidate::unmarshal(
            &c.marshal(),
        )?))
        .await?;
    }
    for c in b.get_local_candidates().await {
        a.add_remote_candidate(Arc::new(crate::candidate::Candidate::unmarshal(
            &c.marshal(),
        )?))
        .await?;
    }

    // both sides claim the controlling role
    a.start_connectivity(true).await?;
    b.start_connectivity(true).await?;

    let mut connected = false;
    for _ in 0..400 {
        let sa = a.connection_state().await;
        let sb = b.connection_state().await;
        if (sa == ConnectionState::Connected || sa == ConnectionState::Completed)
            && (sb == ConnectionState::Connected || sb == ConnectionState::Completed)
        {
            connected = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(connected, "agents must converge despite the role conflict");

    // exactly one side ended up controlling
    let a_controlling = { a.internal.lock().await.is_controlling };
    let b_controlling = { b.internal.lock().await.is_controlling };
    assert_ne!(
        a_controlling, b_controlling,
        "the tie breaker must leave exactly one controlling agent"
    );

    a.close().await?;
    b.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_credentials_required_before_start() -> Result<()> {
    let a = new_local_agent().await?;
    let result = a.start_connectivity(true).await;
    assert_eq!(result.err(), Some(Error::ErrRemoteUfragEmpty));
    a.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_restart_clears_remote_state() -> Result<()> {
    let (a, b) = connect_pair().await?;

    let (old_ufrag, _) = a.get_local_user_credentials().await;
    a.restart(String::new(), String::new()).await?;
    let (new_ufrag, _) = a.get_local_user_credentials().await;
    assert_ne!(old_ufrag, new_ufrag, "restart must rotate credentials");
    assert!(a.get_selected_candidate_pair().await.is_none());

    a.close().await?;
    b.close().await?;
    Ok(())
}
