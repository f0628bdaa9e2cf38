//! Session registry: device discovery, selection and monitoring

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use hdc_core::{
    BoxError, DeviceId, DeviceSnapshot, DeviceSource, Flow, HdcError, Result, SnapshotDiff,
};
use hdc_protocol::Message;

use crate::client::HdcClient;
use crate::transport::{cancelled, unexpected, with_deadline};

impl HdcClient {
    /// Ask the daemon for the currently connected devices
    pub async fn list_targets(&self) -> Result<DeviceSnapshot> {
        with_deadline(self.config().request_timeout, async {
            let mut conn = self.open_global().await?;
            conn.send(Message::ListTargets).await?;

            let snapshot = match conn.recv().await? {
                Message::Targets { devices } => {
                    DeviceSnapshot::try_from_ids(devices).map_err(|dup| {
                        HdcError::Protocol(format!("Duplicate device id in target list: {}", dup))
                    })?
                }
                Message::Error { message, .. } => return Err(HdcError::Protocol(message)),
                other => return Err(unexpected(&other)),
            };

            debug!(count = snapshot.len(), "Listed targets");
            Ok(snapshot)
        })
        .await
    }

    /// Bind `device` as the routing target for per-device operations
    ///
    /// The id must appear in a fresh target list. On failure the previous
    /// binding is left untouched.
    pub async fn connect_device(&mut self, device: impl Into<DeviceId>) -> Result<()> {
        let device = device.into();
        let snapshot = self.list_targets().await?;
        if !snapshot.contains(device.as_str()) {
            return Err(HdcError::UnknownDevice(device));
        }

        info!("Connected to device {}", device);
        self.set_active(Some(device));
        Ok(())
    }

    /// Clear the active device, returning it
    pub fn disconnect_device(&mut self) -> Option<DeviceId> {
        let previous = self.set_active(None);
        if let Some(device) = &previous {
            info!("Disconnected from device {}", device);
        }
        previous
    }

    /// Currently bound device, if any
    pub fn active_device(&self) -> Option<&DeviceId> {
        self.active()
    }

    /// Poll until at least one device is connected and return the first one
    ///
    /// `None` waits forever. Polling errors are returned as-is.
    pub async fn wait_for_device(&self, timeout: Option<Duration>) -> Result<DeviceId> {
        wait_for_any(self, self.config().poll_interval, timeout).await
    }

    /// Watch the device set, calling `callback` with every snapshot
    ///
    /// The callback also receives the change since the previous snapshot
    /// (the first call diffs against an empty set). Returning `Flow::Stop`
    /// ends the watch with `Ok(())`; returning an error ends it with
    /// [`HdcError::Handler`].
    pub async fn monitor_devices<F, E>(&self, interval: Duration, callback: F) -> Result<()>
    where
        F: FnMut(&DeviceSnapshot, &SnapshotDiff) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        watch(self, interval, None, callback).await
    }

    /// Same as [`HdcClient::monitor_devices`], also ending when `cancel` fires
    pub async fn monitor_devices_until<F, E>(
        &self,
        interval: Duration,
        cancel: &CancellationToken,
        callback: F,
    ) -> Result<()>
    where
        F: FnMut(&DeviceSnapshot, &SnapshotDiff) -> std::result::Result<Flow, E>,
        E: Into<BoxError>,
    {
        watch(self, interval, Some(cancel), callback).await
    }
}

#[async_trait]
impl DeviceSource for HdcClient {
    async fn snapshot(&self) -> Result<DeviceSnapshot> {
        self.list_targets().await
    }
}

/// Poll `source` every `poll` until it reports a device
pub async fn wait_for_any<S>(
    source: &S,
    poll: Duration,
    limit: Option<Duration>,
) -> Result<DeviceId>
where
    S: DeviceSource + ?Sized,
{
    let wait = async {
        loop {
            let snapshot = source.snapshot().await?;
            if let Some(device) = snapshot.first() {
                info!("Device {} is available", device);
                return Ok::<_, HdcError>(device.clone());
            }
            tokio::time::sleep(poll).await;
        }
    };
    with_deadline(limit, wait).await
}

/// Poll `source` every `interval`, feeding each snapshot and its diff to `callback`
///
/// At least `interval` passes between two callback invocations.
pub async fn watch<S, F, E>(
    source: &S,
    interval: Duration,
    cancel: Option<&CancellationToken>,
    mut callback: F,
) -> Result<()>
where
    S: DeviceSource + ?Sized,
    F: FnMut(&DeviceSnapshot, &SnapshotDiff) -> std::result::Result<Flow, E>,
    E: Into<BoxError>,
{
    if interval.is_zero() {
        return Err(HdcError::InvalidArgument(
            "monitor interval must be positive".into(),
        ));
    }

    let mut previous = DeviceSnapshot::new();
    loop {
        let snapshot = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Ok(()),
            snapshot = source.snapshot() => snapshot?,
        };

        let diff = previous.diff(&snapshot);
        if !diff.is_empty() {
            debug!(added = ?diff.added, removed = ?diff.removed, "Device set changed");
        }

        let flow = callback(&snapshot, &diff).map_err(|e| HdcError::Handler(e.into()))?;
        if flow.is_stop() {
            return Ok(());
        }
        previous = snapshot;

        tokio::select! {
            biased;
            _ = cancelled(cancel) => return Ok(()),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::sync::Mutex;

    /// Replays a fixed list of snapshots, repeating the last one forever
    struct Scripted {
        snapshots: Mutex<VecDeque<DeviceSnapshot>>,
    }

    impl Scripted {
        fn new(steps: &[&[&str]]) -> Self {
            let snapshots = steps
                .iter()
                .map(|ids| DeviceSnapshot::try_from_ids(ids.iter().copied()).unwrap())
                .collect();
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl DeviceSource for Scripted {
        async fn snapshot(&self) -> Result<DeviceSnapshot> {
            let mut snapshots = self.snapshots.lock().unwrap();
            if snapshots.len() > 1 {
                Ok(snapshots.pop_front().unwrap())
            } else {
                Ok(snapshots.front().cloned().unwrap_or_default())
            }
        }
    }

    struct Failing;

    #[async_trait]
    impl DeviceSource for Failing {
        async fn snapshot(&self) -> Result<DeviceSnapshot> {
            Err(HdcError::Io(std::io::ErrorKind::ConnectionRefused.into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_first_device() {
        let source = Scripted::new(&[&[], &[], &["b", "a"]]);
        let device = wait_for_any(&source, Duration::from_millis(100), None)
            .await
            .unwrap();
        assert_eq!(device, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let source = Scripted::new(&[&[]]);
        let result = wait_for_any(
            &source,
            Duration::from_millis(100),
            Some(Duration::from_secs(1)),
        )
        .await;
        assert!(matches!(result, Err(HdcError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_propagates_poll_error() {
        let result = wait_for_any(&Failing, Duration::from_millis(100), None).await;
        assert!(matches!(result, Err(HdcError::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_reports_diffs_every_tick() {
        let source = Scripted::new(&[&["a"], &["a"], &["a", "b"], &["b"]]);
        let mut seen = Vec::new();

        watch(&source, Duration::from_secs(1), None, |snapshot, diff| {
            seen.push((snapshot.len(), diff.clone()));
            Ok::<_, Infallible>(Flow::from(seen.len() < 4))
        })
        .await
        .unwrap();

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].1.added, vec![DeviceId::new("a")]);
        assert!(seen[1].1.is_empty());
        assert_eq!(seen[2].1.added, vec![DeviceId::new("b")]);
        assert_eq!(seen[3].1.removed, vec![DeviceId::new("a")]);
        assert!(seen[3].1.added.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_spaces_calls_by_interval() {
        let source = Scripted::new(&[&["a"]]);
        let mut stamps = Vec::new();

        watch(&source, Duration::from_secs(2), None, |_, _| {
            stamps.push(tokio::time::Instant::now());
            Ok::<_, Infallible>(Flow::from(stamps.len() < 3))
        })
        .await
        .unwrap();

        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_handler_error() {
        let source = Scripted::new(&[&["a"]]);
        let result = watch(&source, Duration::from_secs(1), None, |_, _| {
            Err::<Flow, _>("consumer gave up")
        })
        .await;

        match result {
            Err(HdcError::Handler(e)) => assert_eq!(e.to_string(), "consumer gave up"),
            other => panic!("Expected Handler error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_cancellation_is_clean() {
        let source = Scripted::new(&[&["a"]]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut calls = 0;

        let result = watch(&source, Duration::from_secs(1), Some(&cancel), |_, _| {
            calls += 1;
            if calls == 2 {
                trigger.cancel();
            }
            Ok::<_, Infallible>(Flow::Continue)
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_watch_rejects_zero_interval() {
        let source = Scripted::new(&[&["a"]]);
        let result = watch(&source, Duration::ZERO, None, |_, _| {
            Ok::<_, Infallible>(Flow::Stop)
        })
        .await;
        assert!(matches!(result, Err(HdcError::InvalidArgument(_))));
    }
}
