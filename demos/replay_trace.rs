//! Synthesize a pursuit trace and replay it through the detector

use gaze_pursuit::{replay_trace, DetectorConfig, Point, TraceEvent};

fn main() {
    let mut events = vec![TraceEvent::Start];
    for tick in 0..60i64 {
        // Increase cue sweeps right along y=300, decrease cue sweeps left along y=500
        let offset = (tick % 40) as f64 * 8.0;
        let increase = Point::new(100.0 + offset, 300.0);
        let decrease = Point::new(500.0 - offset, 500.0);
        events.push(TraceEvent::Sample {
            timestamp_ms: tick * 30,
            gaze: Point::new(increase.x + 2.0, increase.y - 1.0),
            increase: Some(increase),
            decrease: Some(decrease),
        });
    }
    events.push(TraceEvent::Stop);

    let trace: Vec<String> = events
        .iter()
        .filter_map(|e| serde_json::to_string(e).ok())
        .collect();

    match replay_trace(&trace.join("\n"), DetectorConfig::default()) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {e:?}"),
        },
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
