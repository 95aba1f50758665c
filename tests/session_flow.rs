//! End-to-end session tests over an in-process frame source
//!
//! The peer half plays the simulation server: it sends one frame, waits for
//! the client's `ok`, then computes the next one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use simview::{
    ChannelPeer, ChannelSource, ConnectionState, ControlToken, Frame, ObjectPool, OverflowPolicy,
    PlaybackConfig, PlaybackState, Simview, UpdateRate,
};

fn frame(time: f64, particles: usize) -> Frame {
    Frame::new(time, (0..particles).map(|i| [i as f64, time, -time]).collect())
}

/// Serve `count` frames `dt` apart, honoring the pull protocol
async fn serve(peer: &mut ChannelPeer, count: usize, dt: f64, particles: usize) {
    for i in 0..count {
        assert!(peer.send_frame(&frame(i as f64 * dt, particles)).unwrap());
        assert_eq!(peer.recv_control().await, Some(ControlToken::Ack));
    }
}

#[tokio::test(start_paused = true)]
async fn stream_is_played_to_the_end_after_server_hangs_up() {
    let (source, mut peer) = ChannelSource::pair();
    let pool = Arc::new(Mutex::new(ObjectPool::new(4)));
    let mut session = Simview::start(source, PlaybackConfig::default(), pool.clone()).unwrap();

    serve(&mut peer, 20, 0.01, 4).await;
    drop(peer);

    session.disconnected().await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);

    // 19 gaps of 20ms plus the fallback delay for the last frame.
    tokio::time::sleep(Duration::from_secs(2)).await;

    {
        let pool = pool.lock().unwrap();
        assert_eq!(pool.frames_applied(), 20);
        assert_eq!(pool.last_time(), Some(19.0 * 0.01));
        assert_eq!(pool.position(3), Some([3.0, 19.0 * 0.01, -19.0 * 0.01]));
    }
    assert_eq!(session.buffered_frames(), 0);
    assert_eq!(session.ingest_stats().acknowledged, 20);

    session.close().await;
    assert_eq!(session.status().state, PlaybackState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn close_mid_stream_discards_buffer_and_tells_server() {
    let (source, mut peer) = ChannelSource::pair();
    let pool = Arc::new(Mutex::new(ObjectPool::new(2)));
    let mut session = Simview::start(source, PlaybackConfig::default(), pool.clone()).unwrap();

    // Large gaps keep most frames waiting in the buffer.
    serve(&mut peer, 5, 1.0, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.buffered_frames() >= 4);

    session.close().await;

    assert_eq!(peer.recv_control().await, Some(ControlToken::Close));
    assert_eq!(peer.recv_control().await, None);
    assert!(!peer.send_text(r#"{"time": 9.0, "positions": [[0, 0, 0], [0, 0, 0]]}"#));
    assert_eq!(session.buffered_frames(), 0);

    // No presentation happens after close returns.
    let applied = pool.lock().unwrap().frames_applied();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(pool.lock().unwrap().frames_applied(), applied);

    session.close().await;
    assert!(session.is_closed());
}

#[tokio::test(start_paused = true)]
async fn new_session_starts_with_empty_buffer() {
    let (source, mut peer) = ChannelSource::pair();
    let mut first = Simview::start(source, PlaybackConfig::default(), ObjectPool::new(3)).unwrap();
    serve(&mut peer, 3, 1.0, 3).await;
    first.close().await;

    let (source, mut peer) = ChannelSource::pair();
    let mut second = Simview::start(source, PlaybackConfig::default(), ObjectPool::new(1)).unwrap();
    assert_eq!(second.buffered_frames(), 0);
    assert_eq!(second.particle_count(), None);

    serve(&mut peer, 1, 1.0, 1).await;
    assert_eq!(second.particle_count(), Some(1));
    assert_eq!(second.buffered_frames(), 1);

    second.close().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_and_mismatched_frames_do_not_stall_playback() {
    let (source, mut peer) = ChannelSource::pair();
    let pool = Arc::new(Mutex::new(ObjectPool::new(2)));
    let playback = PlaybackConfig { ack_malformed: true, ..PlaybackConfig::default() };
    let mut session = Simview::start(source, playback, pool.clone()).unwrap();

    peer.send_frame(&frame(0.0, 2)).unwrap();
    assert_eq!(peer.recv_control().await, Some(ControlToken::Ack));
    peer.send_text("{not json");
    assert_eq!(peer.recv_control().await, Some(ControlToken::Ack));
    peer.send_frame(&frame(0.1, 5)).unwrap();
    assert_eq!(peer.recv_control().await, Some(ControlToken::Ack));
    peer.send_frame(&frame(0.2, 2)).unwrap();
    assert_eq!(peer.recv_control().await, Some(ControlToken::Ack));
    drop(peer);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let status = session.status();
    assert_eq!(status.presented, 2);
    assert_eq!(status.dropped, 1);
    assert_eq!(session.ingest_stats().malformed, 1);
    assert_eq!(pool.lock().unwrap().last_time(), Some(0.2));

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn bounded_buffer_keeps_newest_frames() {
    let (source, mut peer) = ChannelSource::pair();
    let playback = PlaybackConfig {
        overflow: OverflowPolicy::DropOldest { capacity: 3 },
        ..PlaybackConfig::default()
    };
    let mut session = Simview::start(source, playback, ObjectPool::new(1)).unwrap();

    serve(&mut peer, 10, 10.0, 1).await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(session.buffered_frames() <= 3);
    assert!(session.buffer_stats().evicted >= 6);

    session.close().await;
}

#[tokio::test(start_paused = true)]
async fn status_updates_report_progress() {
    let (source, mut peer) = ChannelSource::pair();
    let mut session =
        Simview::start(source, PlaybackConfig::default(), ObjectPool::new(1)).unwrap();
    let mut updates = session.status_updates(UpdateRate::Immediate);

    let initial = updates.next().await.unwrap();
    assert_eq!(initial.presented, 0);

    serve(&mut peer, 2, 0.05, 1).await;

    let presented = loop {
        let status = updates.next().await.unwrap();
        if status.presented > 0 {
            break status;
        }
    };
    assert_eq!(presented.current_time, Some(0.0));
    assert_eq!(presented.state, PlaybackState::Presenting);

    session.close().await;
}
