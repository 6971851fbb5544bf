//! ControlService against the host-simulated MQTT adapter.

use crate::mock_hw::{RAW_135_DEG, RecordingSink, ScriptedSensor};

use rosecompass::adapters::device_id;
use rosecompass::adapters::mqtt::{MqttBus, MqttSettings};
use rosecompass::app::protocol::{LoopAction, OFFLINE, ONLINE, PONG, SOLVED_TRIGGER};
use rosecompass::app::service::ControlService;
use rosecompass::config::SystemConfig;

fn connect(config: &SystemConfig, svc: &ControlService) -> MqttBus {
    let client_id = device_id::client_id(&config.device_name, &device_id::read_mac());
    let topics = svc.protocol().topics();
    MqttBus::connect(&MqttSettings {
        broker_host: &config.network.broker_host,
        broker_port: config.network.broker_port,
        client_id: &client_id,
        buffer_size: config.network.mqtt_buffer_size,
        will_topic: &topics.status,
        will_payload: OFFLINE,
    })
    .expect("simulated broker always accepts")
}

#[test]
fn full_session_over_simulated_broker() {
    let config = SystemConfig::default();
    let mut svc = ControlService::new(&config);
    let topics = svc.protocol().topics().clone();
    let mut bus = connect(&config, &svc);
    let mut sensor = ScriptedSensor::constant(RAW_135_DEG);
    let mut sink = RecordingSink::new();
    svc.start(&mut sink);

    // Commands sent before the subscription exists are lost.
    bus.sim_inject(&topics.command, b"PING");
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    assert!(
        !bus.sim_published()
            .iter()
            .any(|p| p.payload == PONG)
    );

    bus.sim_inject(&topics.command, b"PING");
    for t in 1..=10 {
        assert_eq!(svc.tick(t * 50, &mut sensor, &mut bus, &mut sink), LoopAction::Continue);
    }

    let published = bus.sim_published();
    let first = &published[0];
    assert_eq!((first.topic.as_str(), first.payload.as_str(), first.retain), (topics.status.as_str(), ONLINE, true));
    assert!(published.iter().any(|p| p.topic == topics.status && p.payload == PONG));
    assert!(published.iter().any(|p| p.topic == topics.solved && p.payload == SOLVED_TRIGGER));
    assert!(svc.is_solved());
}

#[test]
fn dropped_session_resubscribes_on_return() {
    let config = SystemConfig::default();
    let mut svc = ControlService::new(&config);
    let topics = svc.protocol().topics().clone();
    let mut bus = connect(&config, &svc);
    let mut sensor = ScriptedSensor::constant(RAW_135_DEG);
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.sim_set_connected(false);
    svc.tick(50, &mut sensor, &mut bus, &mut sink);
    bus.sim_set_connected(true);
    svc.tick(100, &mut sensor, &mut bus, &mut sink);

    bus.sim_inject(&topics.command, b"RESET");
    assert_eq!(
        svc.tick(150, &mut sensor, &mut bus, &mut sink),
        LoopAction::ShutdownRequested
    );
}
