use gyre::dynamics::InputCommand;
use std::thread;

use crate::load_aircraft;

#[test]
fn commands_from_another_thread() {
    let mut fdm = load_aircraft("trainer");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();

    let tx = fdm.input_sender();
    let driver = thread::spawn(move || {
        for i in 0..20 {
            let throttle = f64::from(i) / 20.0;
            tx.send(InputCommand::new("fcs/throttle-cmd-norm[0]", throttle))
                .unwrap();
        }
        // Not a boolean, rejected without stopping the frame
        tx.send(InputCommand::new("simulation/holding", 0.5)).unwrap();
    });
    driver.join().unwrap();

    // At most 16 commands per frame
    fdm.run().unwrap();
    assert_eq!(
        fdm.properties().get_i64("simulation/input/applied").unwrap(),
        16
    );
    assert_eq!(
        fdm.get_property_value("fcs/throttle-cmd-norm[0]").unwrap(),
        0.75
    );

    fdm.run().unwrap();
    assert_eq!(
        fdm.properties().get_i64("simulation/input/applied").unwrap(),
        20
    );
    assert_eq!(
        fdm.properties().get_i64("simulation/input/rejected").unwrap(),
        1
    );
    assert_eq!(
        fdm.get_property_value("fcs/throttle-cmd-norm[0]").unwrap(),
        0.95
    );
    assert!(!fdm.holding());
}

#[test]
fn commands_apply_while_holding() {
    let mut fdm = load_aircraft("ball");
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    fdm.hold();
    let time = fdm.sim_time();

    fdm.input_sender()
        .send(InputCommand::new("simulation/holding", false))
        .unwrap();
    fdm.run().unwrap();
    assert_eq!(fdm.sim_time(), time);
    assert!(!fdm.holding());
    fdm.run().unwrap();
    assert!(fdm.sim_time() > time);
}

#[test]
fn output_rows_follow_the_channel_rate() {
    let mut fdm = load_aircraft("ball");
    assert_eq!(fdm.output().num_channels(), 1);
    fdm.load_ic("reset00").unwrap();
    fdm.run_ic().unwrap();
    assert_eq!(fdm.output().rows(0), Some(1));

    // One second at 120 Hz, sampled at 10 Hz
    for _ in 0..120 {
        fdm.run().unwrap();
    }
    assert_eq!(fdm.output().rows(0), Some(11));

    let contents = fdm.output().contents(0).unwrap();
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        ["Time", "position/h-sl-ft", "velocities/v-down-fps"]
    );
    let rows = reader
        .records()
        .map(|r| {
            r.unwrap()
                .iter()
                .map(|v| v.parse::<f64>().unwrap())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0][0], 0.0);
    // Rows are stamped with the time at the start of their frame
    for pair in rows[1..].windows(2) {
        assert!((pair[1][0] - pair[0][0] - 0.1).abs() < 1e-9);
    }
    assert!((rows[10][0] - 119.0 / 120.0).abs() < 1e-9);
    // Free fall: the ball is lower and faster at every sample
    for pair in rows.windows(2) {
        assert!(pair[1][1] < pair[0][1]);
        assert!(pair[1][2] > pair[0][2]);
    }

    // A disabled output writes nothing
    fdm.set_property_value("simulation/output/enabled", 0.0).unwrap();
    for _ in 0..24 {
        fdm.run().unwrap();
    }
    assert_eq!(fdm.output().rows(0), Some(11));
}
