//! On-target tests for the Eddystone frame encoders and the rotation
//! scheduler. Reference byte vectors were worked out by hand from the frame
//! layouts; every multi-byte field is big-endian on the air.

#![no_std]
#![no_main]

use eddystone_beacon_rs as _;

#[defmt_test::tests]
mod tests {
    use defmt::{assert, assert_eq};

    use eddystone_beacon_rs::eddystone::frame::{
        ADV_MAX_SIZE, EncodeError, Frame, FrameKind, SERVICE_DATA_LEN_OFFSET, Telemetry,
        UrlScheme, encode_header, encode_tlm, encode_uid, encode_url, pack_temperature,
    };
    use eddystone_beacon_rs::eddystone::scheduler::{AdvertisementScheduler, select_frame};
    use eddystone_beacon_rs::eddystone::store::{BeaconConfig, FrameStore};
    use eddystone_beacon_rs::eddystone::{RadioAdvertiser, RadioError, SensorSource};

    const NAMESPACE: [u8; 10] = [0x8C, 0x25, 0x7B, 0xA1, 0xB6, 0xC0, 0x10, 0x43, 0xEE, 0xA4];
    const ADDRESS: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
    const RSSI: i8 = -61; // 0xC3

    struct FixedSensors {
        battery_mv: u16,
        temperature: u16,
    }

    impl SensorSource for FixedSensors {
        fn battery_millivolts(&mut self) -> u16 {
            self.battery_mv
        }

        fn temperature_raw(&mut self) -> u16 {
            self.temperature
        }
    }

    #[derive(Clone, Copy)]
    enum RadioMode {
        Accept,
        Busy,
        Fatal,
    }

    struct MockRadio {
        mode: RadioMode,
        pushes: u32,
        last: Frame,
    }

    impl MockRadio {
        fn new(mode: RadioMode) -> Self {
            MockRadio {
                mode,
                pushes: 0,
                last: Frame::empty(),
            }
        }
    }

    impl RadioAdvertiser for MockRadio {
        fn set_advertisement_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
            match self.mode {
                RadioMode::Accept => {
                    self.last = Frame::copy_from(payload).unwrap();
                    self.pushes += 1;
                    Ok(())
                }
                RadioMode::Busy => Err(RadioError::Busy),
                RadioMode::Fatal => Err(RadioError::Fatal),
            }
        }
    }

    fn test_config() -> BeaconConfig {
        BeaconConfig {
            namespace: NAMESPACE,
            device_address: ADDRESS,
            url: b"goo.gl/jjurOU",
            url_scheme: UrlScheme::Http,
            measured_rssi: RSSI,
        }
    }

    fn test_store() -> FrameStore {
        let mut sensors = FixedSensors {
            battery_mv: 0,
            temperature: 0,
        };
        FrameStore::new(&test_config(), &mut sensors).unwrap()
    }

    #[test]
    fn header_is_twelve_bytes_with_trailing_frame_type() {
        let mut buf = [0u8; ADV_MAX_SIZE];
        let len = encode_header(&mut buf, 0x20).unwrap();
        assert_eq!(len, 12);
        assert_eq!(
            &buf[..12],
            &[0x02, 0x01, 0x06, 0x03, 0x03, 0xAA, 0xFE, 0x03, 0x16, 0xAA, 0xFE, 0x20]
        );
    }

    #[test]
    fn service_data_length_byte_counts_everything_after_it() {
        let mut buf = [0u8; ADV_MAX_SIZE];

        let len = encode_uid(&mut buf, &NAMESPACE, &ADDRESS, RSSI).unwrap();
        assert_eq!(buf[SERVICE_DATA_LEN_OFFSET] as usize, len - 8);

        for url in [b"" as &[u8], b"x", b"goo.gl/jjurOU", b"example.org/abc"] {
            let len = encode_url(&mut buf, UrlScheme::HttpsWww, url, RSSI).unwrap();
            assert_eq!(buf[SERVICE_DATA_LEN_OFFSET] as usize, len - 8);
        }

        let telemetry = Telemetry {
            battery_mv: 2987,
            temperature: 0x1519,
            adv_count: 1234,
            tick_count: 5678,
        };
        let len = encode_tlm(&mut buf, &telemetry).unwrap();
        assert_eq!(buf[SERVICE_DATA_LEN_OFFSET] as usize, len - 8);
    }

    #[test]
    fn uid_frame_matches_reference_bytes() {
        let mut buf = [0u8; ADV_MAX_SIZE];
        let len = encode_uid(&mut buf, &NAMESPACE, &ADDRESS, RSSI).unwrap();
        assert_eq!(len, 31);
        #[rustfmt::skip]
        let expected: [u8; 31] = [
            0x02, 0x01, 0x06,
            0x03, 0x03, 0xAA, 0xFE,
            0x17, 0x16, 0xAA, 0xFE,
            0x00, // UID frame type
            0xC3, // calibrated RSSI at 1 m
            0x8C, 0x25, 0x7B, 0xA1, 0xB6, 0xC0, 0x10, 0x43, 0xEE, 0xA4,
            0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // device address, reversed
            0x00, 0x00, // RFU
        ];
        assert_eq!(&buf[..len], &expected);
    }

    #[test]
    fn url_frame_matches_reference_bytes() {
        let mut buf = [0u8; ADV_MAX_SIZE];
        let len = encode_url(&mut buf, UrlScheme::Http, b"goo.gl/jjurOU", RSSI).unwrap();
        assert_eq!(len, 27);
        assert_eq!(buf[SERVICE_DATA_LEN_OFFSET], 19);
        assert_eq!(buf[11], 0x10); // URL frame type
        assert_eq!(buf[12], 0xC3);
        assert_eq!(buf[13], 0x02); // http://
        assert_eq!(&buf[14..27], b"goo.gl/jjurOU");
    }

    #[test]
    fn tlm_frame_matches_reference_bytes() {
        let mut buf = [0u8; ADV_MAX_SIZE];
        let telemetry = Telemetry {
            battery_mv: 3000,
            temperature: 0x1900,
            adv_count: 42,
            tick_count: 7,
        };
        let len = encode_tlm(&mut buf, &telemetry).unwrap();
        assert_eq!(len, 27);
        assert_eq!(buf[SERVICE_DATA_LEN_OFFSET], 19);
        assert_eq!(buf[11], 0x20); // TLM frame type
        #[rustfmt::skip]
        let body: [u8; 15] = [
            0x00,                   // TLM version
            0x0B, 0xB8,             // 3000 mV
            0x19, 0x00,             // 25.00 C
            0x00, 0x00, 0x00, 0x2A, // advertising PDU count
            0x00, 0x00, 0x00, 0x07, // ticks since power-on
            0x00, 0x00,             // RFU
        ];
        assert_eq!(&buf[12..27], &body);
    }

    #[test]
    fn temperature_packing_sign_extends_like_the_sensor_convention() {
        assert_eq!(pack_temperature(100), 0x1900); // 25.00 C
        assert_eq!(pack_temperature(87), 0x154B); // 21.75 C
        assert_eq!(pack_temperature(-8), 0xFE00); // -2.00 C
        // Small negative readings bleed the low byte's sign into the high
        // byte; kept bit-exact for receivers calibrated against it.
        assert_eq!(pack_temperature(-3), 0xFFB5);
    }

    #[test]
    fn encode_is_idempotent() {
        let mut first = [0u8; ADV_MAX_SIZE];
        let mut second = [0u8; ADV_MAX_SIZE];
        let len_a = encode_uid(&mut first, &NAMESPACE, &ADDRESS, RSSI).unwrap();
        let len_b = encode_uid(&mut second, &NAMESPACE, &ADDRESS, RSSI).unwrap();
        assert_eq!(len_a, len_b);
        assert_eq!(&first[..len_a], &second[..len_b]);
    }

    #[test]
    fn encode_fails_cleanly_when_capacity_is_one_byte_short() {
        let mut buf = [0u8; 30]; // UID needs 31
        assert_eq!(
            encode_uid(&mut buf, &NAMESPACE, &ADDRESS, RSSI),
            Err(EncodeError::Overflow)
        );

        let mut buf = [0u8; 26]; // this URL frame needs 27
        assert_eq!(
            encode_url(&mut buf, UrlScheme::Http, b"goo.gl/jjurOU", RSSI),
            Err(EncodeError::Overflow)
        );
    }

    #[test]
    fn url_longer_than_an_advertisement_is_rejected() {
        // 12 header + 1 RSSI + 1 scheme + 18 = 32 bytes, one too many
        let mut buf = [0u8; ADV_MAX_SIZE];
        let result = encode_url(&mut buf, UrlScheme::Https, b"example.org/abcdef", RSSI);
        assert_eq!(result, Err(EncodeError::Overflow));
    }

    #[test]
    fn rotation_policy_precedence_and_mix() {
        assert_eq!(select_frame(1), None);
        assert_eq!(select_frame(3), Some(FrameKind::Uid));
        assert_eq!(select_frame(5), Some(FrameKind::Url));
        // divisible by 3 as well, but the TLM slot is tested first
        assert_eq!(select_frame(9), Some(FrameKind::Tlm));
        // divisible by 5 and 3; URL precedes UID
        assert_eq!(select_frame(15), Some(FrameKind::Url));
        assert_eq!(select_frame(18), Some(FrameKind::Tlm));
        // divisible by 9, 5 and 3; TLM still wins
        assert_eq!(select_frame(45), Some(FrameKind::Tlm));

        let mut tlm = 0;
        let mut url = 0;
        let mut uid = 0;
        let mut none = 0;
        for counter in 1..=45 {
            match select_frame(counter) {
                Some(FrameKind::Tlm) => tlm += 1,
                Some(FrameKind::Url) => url += 1,
                Some(FrameKind::Uid) => uid += 1,
                None => none += 1,
            }
        }
        assert_eq!((tlm, url, uid, none), (5, 8, 8, 24));
    }

    #[test]
    fn idle_ticks_are_inert() {
        let mut scheduler = AdvertisementScheduler::new(test_store());
        let mut sensors = FixedSensors {
            battery_mv: 3000,
            temperature: 0x1900,
        };
        let mut radio = MockRadio::new(RadioMode::Accept);
        for _ in 0..20 {
            let pushed = scheduler
                .on_radio_tick(false, &mut sensors, &mut radio)
                .unwrap();
            assert!(pushed.is_none());
        }
        assert_eq!(radio.pushes, 0);
        assert_eq!(scheduler.tick_count(), 0);
        assert_eq!(scheduler.adv_count(), 0);
    }

    #[test]
    fn rotation_pushes_uid_url_uid_tlm_over_nine_ticks() {
        let mut scheduler = AdvertisementScheduler::new(test_store());
        let mut sensors = FixedSensors {
            battery_mv: 3000,
            temperature: 0x1900,
        };
        let mut radio = MockRadio::new(RadioMode::Accept);

        let mut pushed = [None; 9];
        for slot in pushed.iter_mut() {
            *slot = scheduler
                .on_radio_tick(true, &mut sensors, &mut radio)
                .unwrap();
        }
        assert_eq!(
            pushed,
            [
                None,
                None,
                Some(FrameKind::Uid),
                None,
                Some(FrameKind::Url),
                Some(FrameKind::Uid),
                None,
                None,
                Some(FrameKind::Tlm),
            ]
        );
        assert_eq!(radio.pushes, 4);
        assert_eq!(scheduler.adv_count(), 4);
        assert_eq!(scheduler.tick_count(), 9);

        // The TLM pushed at tick 9 carries the pre-push frame count and the
        // tick count, both big-endian.
        let tlm = radio.last.as_bytes();
        assert_eq!(tlm[11], 0x20);
        assert_eq!(&tlm[13..15], &[0x0B, 0xB8]);
        assert_eq!(&tlm[15..17], &[0x19, 0x00]);
        assert_eq!(&tlm[17..21], &[0x00, 0x00, 0x00, 0x03]);
        assert_eq!(&tlm[21..25], &[0x00, 0x00, 0x00, 0x09]);
    }

    #[test]
    fn tlm_rebuild_reads_fresh_sensor_values() {
        let mut scheduler = AdvertisementScheduler::new(test_store());
        let mut sensors = FixedSensors {
            battery_mv: 3000,
            temperature: 0x1900,
        };
        let mut radio = MockRadio::new(RadioMode::Accept);

        for _ in 0..9 {
            scheduler
                .on_radio_tick(true, &mut sensors, &mut radio)
                .unwrap();
        }
        let first = radio.last;

        // Battery sagged and the die warmed up before the next TLM tick.
        sensors.battery_mv = 2876;
        sensors.temperature = 0x1A40;
        for _ in 9..18 {
            scheduler
                .on_radio_tick(true, &mut sensors, &mut radio)
                .unwrap();
        }
        let second = radio.last;

        assert_eq!(&first.as_bytes()[13..15], &[0x0B, 0xB8]);
        assert_eq!(&second.as_bytes()[13..15], &[0x0B, 0x3C]);
        assert_eq!(&second.as_bytes()[15..17], &[0x1A, 0x40]);
    }

    #[test]
    fn busy_pushes_are_dropped_without_counting() {
        let mut scheduler = AdvertisementScheduler::new(test_store());
        let mut sensors = FixedSensors {
            battery_mv: 3000,
            temperature: 0x1900,
        };
        let mut radio = MockRadio::new(RadioMode::Busy);

        for _ in 0..5 {
            let pushed = scheduler
                .on_radio_tick(true, &mut sensors, &mut radio)
                .unwrap();
            assert!(pushed.is_none());
        }
        assert_eq!(scheduler.adv_count(), 0);
        assert_eq!(scheduler.tick_count(), 5);
    }

    #[test]
    fn fatal_radio_errors_propagate() {
        let mut scheduler = AdvertisementScheduler::new(test_store());
        let mut sensors = FixedSensors {
            battery_mv: 3000,
            temperature: 0x1900,
        };
        let mut radio = MockRadio::new(RadioMode::Fatal);

        // Ticks 1 and 2 select nothing; tick 3 pushes and hits the failure.
        assert_eq!(scheduler.on_radio_tick(true, &mut sensors, &mut radio), Ok(None));
        assert_eq!(scheduler.on_radio_tick(true, &mut sensors, &mut radio), Ok(None));
        assert_eq!(
            scheduler.on_radio_tick(true, &mut sensors, &mut radio),
            Err(RadioError::Fatal)
        );
    }

    #[test]
    fn store_keeps_uid_and_url_immutable_across_tlm_rebuilds() {
        let mut store = test_store();
        let uid_before = *store.get(FrameKind::Uid);
        let url_before = *store.get(FrameKind::Url);

        let telemetry = Telemetry {
            battery_mv: 2500,
            temperature: 0x0B4B,
            adv_count: 99,
            tick_count: 120,
        };
        store.rebuild_tlm(&telemetry).unwrap();

        assert_eq!(uid_before.as_bytes(), store.get(FrameKind::Uid).as_bytes());
        assert_eq!(url_before.as_bytes(), store.get(FrameKind::Url).as_bytes());
        assert_eq!(&store.get(FrameKind::Tlm).as_bytes()[17..21], &[0, 0, 0, 99]);
    }
}
