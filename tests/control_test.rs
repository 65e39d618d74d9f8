//! Control command validation tests

use intersection_sim::simulation::{
    ControlCommand, NullSink, RunState, ScenarioKind, ScenarioPolicy, ScheduledCommand, SignalState,
    SimulationEngine,
};

#[test]
fn test_parse_commands() {
    assert_eq!("start".parse::<ControlCommand>().unwrap(), ControlCommand::Start);
    assert_eq!("  PAUSE ".parse::<ControlCommand>().unwrap(), ControlCommand::Pause);
    assert_eq!("manual".parse::<ControlCommand>().unwrap(), ControlCommand::ManualLightChange);
    assert_eq!("auto".parse::<ControlCommand>().unwrap(), ControlCommand::AutoMode);
    assert_eq!(
        "scenario=rush_hour".parse::<ControlCommand>().unwrap(),
        ControlCommand::ChangeScenario(ScenarioKind::RushHour)
    );

    assert!("jump".parse::<ControlCommand>().is_err());
    assert!("scenario=weekend".parse::<ControlCommand>().is_err());
}

#[test]
fn test_display_parses_back() {
    let commands = [
        ControlCommand::Stop,
        ControlCommand::Reset,
        ControlCommand::ChangeScenario(ScenarioKind::Night),
        ControlCommand::ChangeScenario(ScenarioKind::RushHour),
    ];
    for command in commands {
        assert_eq!(command.to_string().parse::<ControlCommand>().unwrap(), command);
    }
}

#[test]
fn test_parse_scheduled_commands() {
    let scheduled: ScheduledCommand = "300:scenario=night".parse().unwrap();
    assert_eq!(scheduled.tick, 300);
    assert_eq!(scheduled.command, ControlCommand::ChangeScenario(ScenarioKind::Night));

    let scheduled: ScheduledCommand = " 12 :reset".parse().unwrap();
    assert_eq!(scheduled.tick, 12);
    assert_eq!(scheduled.command, ControlCommand::Reset);

    assert!("manual".parse::<ScheduledCommand>().is_err());
    assert!("soon:manual".parse::<ScheduledCommand>().is_err());
    assert!("-1:manual".parse::<ScheduledCommand>().is_err());
    assert!("10:warp".parse::<ScheduledCommand>().is_err());
}

#[test]
fn test_commands_drive_engine() {
    let mut engine = SimulationEngine::new_with_seed(ScenarioKind::Normal, Box::new(NullSink), 3);

    ControlCommand::Start.apply(&mut engine);
    assert_eq!(engine.run_state(), RunState::Running);

    ControlCommand::Pause.apply(&mut engine);
    assert_eq!(engine.run_state(), RunState::Paused);

    ControlCommand::ManualLightChange.apply(&mut engine);
    assert!(engine.controller().is_manual());
    assert_eq!(engine.controller().ns(), SignalState::Green);

    ControlCommand::AutoMode.apply(&mut engine);
    assert!(!engine.controller().is_manual());

    ControlCommand::ChangeScenario(ScenarioKind::RushHour).apply(&mut engine);
    assert_eq!(engine.scenario().kind(), ScenarioKind::RushHour);
    assert_eq!(engine.vehicles().len(), 6);

    ControlCommand::Reset.apply(&mut engine);
    assert!(engine.vehicles().is_empty());
    assert_eq!(engine.run_state(), RunState::Stopped);
    // Reset keeps the active scenario
    assert_eq!(engine.scenario().kind(), ScenarioKind::RushHour);

    ControlCommand::Start.apply(&mut engine);
    ControlCommand::Stop.apply(&mut engine);
    assert_eq!(engine.run_state(), RunState::Stopped);
}
