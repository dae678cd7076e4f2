use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use envsense_common::{
    Endpoint, Publisher, Reading, Sampler, Scheduler, TelemetryConfig, Transport,
    TransportErrorKind,
};
use envsense_host::{SimulatedBme680, StdClock, UreqTransport};

/// A request as received by the fake database.
#[derive(Debug)]
struct Received {
    request_line: String,
    body: String,
    at: Instant,
    /// The client closed the connection after the response.
    closed: bool,
}

/// Serves `connections` connections, answering every request with `status`.
fn fake_influxdb(status: u16, connections: usize) -> (u16, mpsc::Receiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let received = handle(stream.unwrap(), status);
            tx.send(received).unwrap();
        }
    });

    (port, rx)
}

fn handle(mut stream: TcpStream, status: u16) -> Received {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let at = Instant::now();
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();

    write!(
        stream,
        "HTTP/1.1 {status} Whatever\r\nContent-Length: 0\r\n\r\n"
    )
    .unwrap();
    stream.flush().unwrap();

    let mut rest = Vec::new();
    let closed = matches!(reader.read_to_end(&mut rest), Ok(0));

    Received {
        request_line: request_line.trim_end().to_string(),
        body: String::from_utf8(body).unwrap(),
        at,
        closed,
    }
}

/// A port nothing listens on.
fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn endpoint(port: u16) -> Endpoint {
    Endpoint::influxdb("127.0.0.1", port, "test")
}

#[test]
fn posts_line_protocol_on_a_fresh_connection() {
    let (port, rx) = fake_influxdb(204, 2);
    let mut transport = UreqTransport::new();
    let body = "sensor,location=office temperature=21.34\n";

    for _ in 0..2 {
        let response = transport.post(&endpoint(port), body).unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.content_length, Some(0));
    }

    for _ in 0..2 {
        let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received.request_line, "POST /write?db=test HTTP/1.1");
        assert_eq!(received.body, body);
        assert!(received.closed);
    }
}

#[test]
fn server_errors_are_delivered_responses() {
    let (port, rx) = fake_influxdb(500, 1);
    let config = TelemetryConfig {
        endpoint: endpoint(port),
        ..Default::default()
    };
    let mut publisher = Publisher::new(UreqTransport::new(), &config);

    let response = publisher
        .publish(Reading::new(21.34, 45.67, 1013.20, 12000.0))
        .unwrap();

    assert_eq!(response.status, 500);
    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        received.body,
        "sensor,location=office temperature=21.34\n\
         sensor,location=office humidity=45.67\n\
         sensor,location=office pressure=1013.20\n"
    );
}

#[test]
fn refused_connection_is_a_transport_error() {
    let port = unused_port();

    let err = UreqTransport::new()
        .post(&endpoint(port), "sensor,location=office temperature=1.00\n")
        .unwrap_err();

    assert_eq!(err.kind, TransportErrorKind::Connect);
}

#[test]
fn scheduler_pushes_once_per_period() {
    let (port, rx) = fake_influxdb(204, 3);
    let config = TelemetryConfig {
        period: Duration::from_millis(200),
        endpoint: endpoint(port),
        ..Default::default()
    };
    let clock = StdClock::new();
    let sampler = Sampler::new(SimulatedBme680::new(), config.heater, clock).unwrap();
    let publisher = Publisher::new(UreqTransport::new(), &config);
    let mut scheduler = Scheduler::new(&config, sampler, publisher, clock);

    let started = Instant::now();
    let stats = scheduler.run_cycles(3).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.publish_failures, 0);

    let received: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    for pair in received.windows(2) {
        let gap = pair[1].at - pair[0].at;
        assert!(gap > Duration::from_millis(150), "gap was {gap:?}");
        assert!(gap < Duration::from_millis(250), "gap was {gap:?}");
    }
}

#[test]
fn scheduler_stops_on_sensor_failure() {
    let config = TelemetryConfig {
        period: Duration::from_millis(50),
        // Nothing listens here, pushes fail but do not stop the loop.
        endpoint: endpoint(unused_port()),
        ..Default::default()
    };
    let clock = StdClock::new();
    let sensor = SimulatedBme680::new().fail_after(2);
    let sampler = Sampler::new(sensor, config.heater, clock).unwrap();
    let publisher = Publisher::new(UreqTransport::new(), &config);
    let mut scheduler = Scheduler::new(&config, sampler, publisher, clock);

    assert!(scheduler.run().is_err());
    assert_eq!(scheduler.stats().cycles, 2);
    assert_eq!(scheduler.stats().publish_failures, 2);
}
