use chrono::{DateTime, Utc};
use contrail_api::runner::{StepResult, ScriptStep};
use contrail_api::{replay, Command, Outcome, Script};
use contrail_shared::{Address, LedgerEvent};
use contrail_store::app_config::LedgerRules;

const SCENARIO: &str = include_str!("../../demos/scenario.json");

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn address(s: &str) -> Address {
    s.parse().unwrap()
}

fn failure_code(result: &StepResult) -> &str {
    match result {
        StepResult::Failed { code, .. } => code.as_str(),
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_demo_scenario_replays() {
    let script: Script = serde_json::from_str(SCENARIO).unwrap();
    let report = replay(script, &LedgerRules::default(), start()).await.unwrap();

    let r = &report.results;
    assert_eq!(r.len(), 12);
    assert_eq!(r[0], StepResult::Ok { outcome: Outcome::AirplaneRegistered { airplane_id: 0 } });
    assert_eq!(r[1], StepResult::Ok { outcome: Outcome::FlightScheduled { flight_id: 0 } });
    assert_eq!(r[2], StepResult::Ok { outcome: Outcome::TicketIssued { ticket_id: 0 } });
    assert_eq!(r[3], StepResult::Ok { outcome: Outcome::TicketIssued { ticket_id: 1 } });
    assert_eq!(failure_code(&r[4]), "INVALID_ARGUMENT");
    assert_eq!(failure_code(&r[5]), "UNAUTHORIZED");
    // 36h before departure lands in the partial tier.
    assert_eq!(r[7], StepResult::Ok { outcome: Outcome::Refunded { amount: 80 } });
    assert_eq!(failure_code(&r[8]), "INVARIANT_VIOLATION");
    assert_eq!(failure_code(&r[10]), "ALREADY_DEPARTED");
    assert_eq!(r[11], StepResult::Ok { outcome: Outcome::Withdrawn { amount: 70 } });

    assert_eq!(report.escrowed, 0);
    let balance = |owner: &str| {
        report
            .balances
            .iter()
            .find(|b| b.owner == address(owner))
            .map(|b| b.amount)
            .unwrap()
    };
    assert_eq!(balance("00000000-0000-4000-8000-00000000a001"), 70);
    assert_eq!(balance("00000000-0000-4000-8000-00000000b001"), 980);
    assert_eq!(balance("00000000-0000-4000-8000-00000000b002"), 950);

    let names: Vec<&str> = report.events.iter().map(|e| e.event.name()).collect();
    assert_eq!(
        names,
        vec![
            "airplane.registered",
            "flight.scheduled",
            "ticket.bought",
            "ticket.bought",
            "ticket.canceled",
            "funds.withdrawn",
        ]
    );
    let sequences: Vec<u64> = report.events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_rules_shape_the_ledger() {
    let admin = Address::random();
    let buyer = Address::random();
    let departure = start() + chrono::Duration::hours(72);

    let mut steps = vec![
        ScriptStep::Call {
            caller: admin,
            command: Command::RegisterAirplane { seats_first: 1, seats_economy: 10 },
        },
        ScriptStep::Call {
            caller: admin,
            command: Command::ScheduleFlight {
                airplane_id: 0,
                destination: "CDG".into(),
                departure_time: departure,
                price_first: 300,
                price_economy: 100,
            },
        },
    ];
    for _ in 0..3 {
        steps.push(ScriptStep::Call {
            caller: buyer,
            command: Command::BuyTicket {
                flight_id: 0,
                seat_class: contrail_shared::SeatClass::Economy,
                offered_price: 100,
            },
        });
    }
    // 60h out: full tier under the default rules, partial under these.
    steps.push(ScriptStep::Advance { hours: 12 });
    steps.push(ScriptStep::Call { caller: buyer, command: Command::CancelTicket { ticket_id: 0 } });

    let script = Script {
        admin,
        custody: None,
        accounts: vec![contrail_api::runner::Funding { owner: buyer, amount: 1_000 }],
        steps,
    };
    let rules = LedgerRules {
        max_tickets_per_flight: 2,
        full_refund_hours: 72,
        partial_refund_hours: 24,
        partial_refund_percent: 50,
    };

    let report = replay(script, &rules, start()).await.unwrap();
    let r = &report.results;
    assert_eq!(r[3], StepResult::Ok { outcome: Outcome::TicketIssued { ticket_id: 1 } });
    assert_eq!(failure_code(&r[4]), "INVARIANT_VIOLATION");
    assert!(matches!(r[5], StepResult::Advanced { .. }));
    assert_eq!(r[6], StepResult::Ok { outcome: Outcome::Refunded { amount: 50 } });
    assert_eq!(report.escrowed, 150);

    assert!(report.events.iter().any(|e| matches!(
        e.event,
        LedgerEvent::TicketCanceled { ticket_id: 0, .. }
    )));
}

#[tokio::test]
async fn test_invalid_rules_are_rejected() {
    let script = Script {
        admin: Address::random(),
        custody: None,
        accounts: vec![],
        steps: vec![],
    };
    let rules = LedgerRules {
        max_tickets_per_flight: 0,
        ..LedgerRules::default()
    };

    assert!(replay(script, &rules, start()).await.is_err());
}
