//! In-memory fakes for the device and broker ports.
//!
//! Both fakes share their state through an `Arc<Mutex<_>>` so tests can keep
//! a probe after handing the fake to a session or the bridge.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tuyabridge_domain::data_point::{DataPointMap, DataPointValue};
use tuyabridge_domain::error::{BrokerError, DeviceError};
use tuyabridge_domain::message::Message;

use crate::ports::{BrokerHandle, DeviceHandle};

pub(crate) type DeviceScript = VecDeque<Result<DataPointMap, DeviceError>>;

#[derive(Default)]
pub(crate) struct DeviceProbe {
    pub reads: VecDeque<Result<DataPointMap, DeviceError>>,
    pub connect_failures: usize,
    pub online: bool,
    pub connects: usize,
    pub read_calls: usize,
    pub read_delay: Option<Duration>,
}

#[derive(Clone)]
pub(crate) struct FakeDevice {
    pub probe: Arc<Mutex<DeviceProbe>>,
}

impl FakeDevice {
    pub fn new(reads: DeviceScript) -> Self {
        Self {
            probe: Arc::new(Mutex::new(DeviceProbe {
                reads,
                online: true,
                ..DeviceProbe::default()
            })),
        }
    }

    pub fn connects(&self) -> usize {
        self.probe.lock().unwrap().connects
    }

    pub fn read_calls(&self) -> usize {
        self.probe.lock().unwrap().read_calls
    }
}

pub(crate) fn points(entries: &[(&str, DataPointValue)]) -> DataPointMap {
    entries.iter().cloned().collect()
}

impl DeviceHandle for FakeDevice {
    fn connect(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send {
        let mut probe = self.probe.lock().unwrap();
        probe.connects += 1;
        let result = if probe.connect_failures > 0 {
            probe.connect_failures -= 1;
            Err(DeviceError::Unreachable("connect refused".into()))
        } else {
            Ok(())
        };
        async { result }
    }

    fn read_data_points(
        &mut self,
    ) -> impl Future<Output = Result<DataPointMap, DeviceError>> + Send {
        let mut probe = self.probe.lock().unwrap();
        probe.read_calls += 1;
        let delay = probe.read_delay;
        let result = probe
            .reads
            .pop_front()
            .unwrap_or_else(|| Err(DeviceError::Unreachable("script exhausted".into())));
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    fn is_online(&mut self) -> impl Future<Output = Result<bool, DeviceError>> + Send {
        let online = self.probe.lock().unwrap().online;
        async move { Ok(online) }
    }
}

#[derive(Default)]
pub(crate) struct BrokerProbe {
    pub link_up: bool,
    pub connects: usize,
    pub connect_failures: usize,
    pub publish_failures: usize,
    pub published: Vec<Message>,
    pub disconnects: usize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBroker {
    pub probe: Arc<Mutex<BrokerProbe>>,
}

impl FakeBroker {
    pub fn published(&self) -> Vec<Message> {
        self.probe.lock().unwrap().published.clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published().into_iter().map(|m| m.topic).collect()
    }

    pub fn clear(&self) {
        self.probe.lock().unwrap().published.clear();
    }

    pub fn drop_link(&self) {
        self.probe.lock().unwrap().link_up = false;
    }

    pub fn connects(&self) -> usize {
        self.probe.lock().unwrap().connects
    }
}

impl BrokerHandle for FakeBroker {
    fn connect(&mut self) -> impl Future<Output = Result<(), BrokerError>> + Send {
        let mut probe = self.probe.lock().unwrap();
        probe.connects += 1;
        let result = if probe.connect_failures > 0 {
            probe.connect_failures -= 1;
            Err(BrokerError::ConnectionRefused("broker down".into()))
        } else {
            probe.link_up = true;
            Ok(())
        };
        async { result }
    }

    fn publish(&mut self, message: &Message) -> impl Future<Output = Result<(), BrokerError>> + Send {
        let mut probe = self.probe.lock().unwrap();
        let result = if probe.publish_failures > 0 {
            probe.publish_failures -= 1;
            Err(BrokerError::PublishFailed("queue full".into()))
        } else {
            probe.published.push(message.clone());
            Ok(())
        };
        async { result }
    }

    fn is_connected(&self) -> bool {
        self.probe.lock().unwrap().link_up
    }

    fn disconnect(&mut self) -> impl Future<Output = ()> + Send {
        let mut probe = self.probe.lock().unwrap();
        probe.disconnects += 1;
        probe.link_up = false;
        async {}
    }
}
