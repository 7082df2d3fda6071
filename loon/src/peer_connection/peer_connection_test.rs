use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::*;
use crate::data_channel::data_channel_state::RTCDataChannelState;

fn test_configuration() -> RTCConfiguration {
    RTCConfiguration {
        include_loopback_candidates: true,
        ..Default::default()
    }
}

/// Wires trickle ICE between two peer connections.
async fn wire_candidates(pa: &Arc<RTCPeerConnection>, pb: &Arc<RTCPeerConnection>) {
    let (tx_a, mut rx_a) = mpsc::unbounded_channel::<RTCIceCandidateInit>();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel::<RTCIceCandidateInit>();

    pa.on_ice_candidate(Box::new(move |candidate| {
        if let Some(candidate) = candidate {
            let _ = tx_a.send(candidate);
        }
    }));
    pb.on_ice_candidate(Box::new(move |candidate| {
        if let Some(candidate) = candidate {
            let _ = tx_b.send(candidate);
        }
    }));

    let pb2 = Arc::clone(pb);
    tokio::spawn(async move {
        while let Some(candidate) = rx_a.recv().await {
            let _ = pb2.add_ice_candidate(candidate).await;
        }
    });
    let pa2 = Arc::clone(pa);
    tokio::spawn(async move {
        while let Some(candidate) = rx_b.recv().await {
            let _ = pa2.add_ice_candidate(candidate).await;
        }
    });
}

/// One full offer/answer round.
async fn negotiate(pa: &Arc<RTCPeerConnection>, pb: &Arc<RTCPeerConnection>) -> Result<()> {
    let offer = pa.create_offer().await?;
    pa.set_local_description(offer.clone()).await?;
    pb.set_remote_description(RTCSessionDescription::offer(offer.sdp)?)
        .await?;
    let answer = pb.create_answer().await?;
    pb.set_local_description(answer.clone()).await?;
    pa.set_remote_description(RTCSessionDescription::answer(answer.sdp)?)
        .await?;
    Ok(())
}

async fn await_open(dc: &Arc<RTCDataChannel>, what: &str) -> Result<()> {
    for _ in 0..1000 {
        if dc.ready_state() == RTCDataChannelState::Open {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(Error::Other(format!("{what} never reached open")))
}

/// Local loopback data channel: both sides reach `open` and messages
/// flow in both directions.
#[tokio::test]
async fn test_loopback_data_channel() -> Result<()> {
    let pa = RTCPeerConnection::new(test_configuration()).await?;
    let pb = RTCPeerConnection::new(test_configuration()).await?;
    wire_candidates(&pa, &pb).await;

    let dc_a = pa.create_data_channel("chat", None).await?;

    let (msg_a_tx, mut msg_a_rx) = mpsc::unbounded_channel::<String>();
    dc_a.on_message(Box::new(move |m| {
        let _ = msg_a_tx.send(String::from_utf8_lossy(&m.data).into_owned());
    }));

    let (dc_b_tx, mut dc_b_rx) = mpsc::unbounded_channel::<Arc<RTCDataChannel>>();
    pb.on_data_channel(Box::new(move |dc| {
        let _ = dc_b_tx.send(dc);
    }));

    negotiate(&pa, &pb).await?;

    let dc_b = tokio::time::timeout(Duration::from_secs(10), dc_b_rx.recv())
        .await
        .map_err(|_| Error::Other("no remote data channel within 10s".to_owned()))?
        .ok_or_else(|| Error::Other("data channel channel closed".to_owned()))?;
    assert_eq!(dc_b.label(), "chat");

    let (msg_b_tx, mut msg_b_rx) = mpsc::unbounded_channel::<String>();
    dc_b.on_message(Box::new(move |m| {
        let _ = msg_b_tx.send(String::from_utf8_lossy(&m.data).into_owned());
    }));

    await_open(&dc_a, "dialing channel").await?;
    await_open(&dc_b, "accepted channel").await?;

    dc_a.send_text("hi").await?;
    let got = tokio::time::timeout(Duration::from_secs(5), msg_b_rx.recv())
        .await
        .map_err(|_| Error::Other("pb missed the message".to_owned()))?
        .unwrap();
    assert_eq!(got, "hi");

    dc_b.send_text("hi").await?;
    let got = tokio::time::timeout(Duration::from_secs(5), msg_a_rx.recv())
        .await
        .map_err(|_| Error::Other("pa missed the message".to_owned()))?
        .unwrap();
    assert_eq!(got, "hi");

    pa.close().await?;
    pb.close().await?;
    Ok(())
}

/// SCTP reassembles a 50 000-byte message sent over the 1200-byte
/// user-data segments into one delivery.
#[tokio::test]
async fn test_large_message_survives_fragmentation() -> Result<()> {
    let pa = RTCPeerConnection::new(test_configuration()).await?;
    let pb = RTCPeerConnection::new(test_configuration()).await?;
    wire_candidates(&pa, &pb).await;

    let dc_a = pa.create_data_channel("blob", None).await?;

    let (len_tx, mut len_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (dc_b_tx, mut dc_b_rx) = mpsc::unbounded_channel::<Arc<RTCDataChannel>>();
    pb.on_data_channel(Box::new(move |dc| {
        let len_tx = len_tx.clone();
        dc.on_message(Box::new(move |m| {
            let _ = len_tx.send(m.data.to_vec());
        }));
        let _ = dc_b_tx.send(dc);
    }));

    negotiate(&pa, &pb).await?;
    let _dc_b = tokio::time::timeout(Duration::from_secs(10), dc_b_rx.recv())
        .await
        .map_err(|_| Error::Other("no remote channel".to_owned()))?;
    await_open(&dc_a, "blob channel").await?;

    let blob: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    dc_a.send(&Bytes::from(blob.clone())).await?;

    let got = tokio::time::timeout(Duration::from_secs(10), len_rx.recv())
        .await
        .map_err(|_| Error::Other("blob never arrived".to_owned()))?
        .unwrap();
    assert_eq!(got.len(), blob.len());
    assert_eq!(got, blob);

    pa.close().await?;
    pb.close().await?;
    Ok(())
}

/// An ICE restart re-runs connectivity while the data channel stays
/// open; a message sent after the restart negotiation is delivered.
#[tokio::test]
async fn test_ice_restart_preserves_data_channel() -> Result<()> {
    let pa = RTCPeerConnection::new(test_configuration()).await?;
    let pb = RTCPeerConnection::new(test_configuration()).await?;
    wire_candidates(&pa, &pb).await;

    let dc_a = pa.create_data_channel("restart", None).await?;

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<String>();
    let (dc_b_tx, mut dc_b_rx) = mpsc::unbounded_channel::<Arc<RTCDataChannel>>();
    pb.on_data_channel(Box::new(move |dc| {
        let msg_tx = msg_tx.clone();
        dc.on_message(Box::new(move |m| {
            let _ = msg_tx.send(String::from_utf8_lossy(&m.data).into_owned());
        }));
        let _ = dc_b_tx.send(dc);
    }));

    negotiate(&pa, &pb).await?;
    let _dc_b = tokio::time::timeout(Duration::from_secs(10), dc_b_rx.recv())
        .await
        .map_err(|_| Error::Other("no remote channel".to_owned()))?;
    await_open(&dc_a, "channel").await?;

    // capture the credentials to prove the offer rotated them
    let first_offer_ufrag = {
        let desc = pa.local_description().await.unwrap();
        crate::sdp::parse(&desc.sdp)?.ice_credentials().unwrap().0
    };

    pa.restart_ice().await?;
    negotiate(&pa, &pb).await?;

    let second_offer_ufrag = {
        let desc = pa.local_description().await.unwrap();
        crate::sdp::parse(&desc.sdp)?.ice_credentials().unwrap().0
    };
    assert_ne!(
        first_offer_ufrag, second_offer_ufrag,
        "an ICE restart must rotate the ufrag"
    );

    // the channel never left open
    assert_eq!(dc_a.ready_state(), RTCDataChannelState::Open);

    // allow the fresh checklist to converge, then verify delivery
    let mut delivered = false;
    for _ in 0..40 {
        let _ = dc_a.send_text("mid-restart").await;
        if tokio::time::timeout(Duration::from_millis(500), msg_rx.recv())
            .await
            .is_ok()
        {
            delivered = true;
            break;
        }
    }
    assert!(delivered, "message sent around the restart must arrive");

    pa.close().await?;
    pb.close().await?;
    Ok(())
}

/// MIDs never change across renegotiations and come from one monotonic
/// counter.
#[tokio::test]
async fn test_mid_allocation_is_stable() -> Result<()> {
    let pa = RTCPeerConnection::new(test_configuration()).await?;
    let _dc = pa.create_data_channel("first", None).await?;

    let offer1 = pa.create_offer().await?;
    let parsed1 = crate::sdp::parse(&offer1.sdp)?;
    assert_eq!(parsed1.media.len(), 1);
    let data_mid = parsed1.media[0].mid.clone();

    // a second offer re-uses the cached data mid
    let offer2 = pa.create_offer().await?;
    let parsed2 = crate::sdp::parse(&offer2.sdp)?;
    assert_eq!(parsed2.media[0].mid, data_mid);

    pa.close().await?;
    Ok(())
}

/// Signalling state transitions follow RFC 3264; illegal calls reject
/// without mutating state.
#[tokio::test]
async fn test_signaling_state_rejects_illegal_transitions() -> Result<()> {
    let pa = RTCPeerConnection::new(test_configuration()).await?;
    let _dc = pa.create_data_channel("x", None).await?;

    // answering with no remote offer must fail
    let result = pa.create_answer().await;
    assert!(result.is_err());

    let offer = pa.create_offer().await?;
    pa.set_local_description(offer.clone()).await?;
    assert_eq!(pa.signaling_state(), RTCSignalingState::HaveLocalOffer);

    // a remote answer missing credentials must be rejected outright
    let bogus = RTCSessionDescription::answer("v=0\r\ns=-\r\n".to_owned())?;
    assert!(pa.set_remote_description(bogus).await.is_err());
    assert_eq!(pa.signaling_state(), RTCSignalingState::HaveLocalOffer);

    pa.close().await?;
    Ok(())
}
