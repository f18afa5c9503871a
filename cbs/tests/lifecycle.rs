// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! End-to-end lifecycle sequences driven against the in-memory register
//! backend.

use anyhow::Result;

use cbs::CbsError;
use cbs::ShaperCtl;
use cbs::ShaperParams;
use cbs::TcState;
use chip::regs;
use chip::ChipModel;
use chip::ChipTopology;
use chip::MemIo;

const GBPS: u32 = 1_000_000_000;

fn test_ctl(model: ChipModel) -> (ShaperCtl, MemIo) {
    let log = common::logging::init(
        "test",
        &None,
        common::logging::LogFormat::Human,
    )
    .unwrap();
    let mut ctl = ShaperCtl::new(ChipTopology::new(model), &log);
    let io = MemIo::new();
    ctl.bind(Box::new(io.clone())).unwrap();
    (ctl, io)
}

fn video_params(ctl: &ShaperCtl) -> ShaperParams {
    ShaperParams::for_bandwidth(
        25_000_000,
        ctl.topology().port_speed().bps(),
        ctl.topology().max_frame_size(),
    )
    .unwrap()
}

#[test]
fn test_full_bring_up() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = ShaperParams::for_bandwidth(25_000_000, GBPS, 1522)?;

    ctl.configure(1, 7, params)?;
    assert_eq!(ctl.tc_state(1, 7), TcState::Configuring);
    assert!(ctl.reset_pending(1));
    ctl.reset_credits(1)?;
    assert_eq!(ctl.tc_state(1, 7), TcState::CreditReset);
    assert!(!ctl.reset_pending(1));
    ctl.enable(1, 7)?;
    assert_eq!(ctl.tc_state(1, 7), TcState::Enabled);

    // The highest class on the port claims group A.
    let topo = ctl.topology();
    assert_eq!(io.get(topo.idle_slope_reg(1, 0)), 25_000_000);
    assert_eq!(io.get(topo.send_slope_reg(1, 0)), 975_000_000);
    assert_eq!(io.get(topo.hi_credit_reg(1, 0)), 38);
    assert_eq!(io.get(topo.lo_credit_reg(1, 0)), 1483);
    assert_eq!(
        io.get(topo.ctrl_reg(1)),
        regs::CTRL_MODE_CREDIT_BASED | regs::ctrl_group_enable(0)
    );

    // The enable bit is the last register written in the whole sequence.
    let log = io.write_log();
    let (last_addr, last_val) = *log.last().unwrap();
    assert_eq!(last_addr, topo.ctrl_reg(1));
    assert_ne!(last_val & regs::ctrl_group_enable(0), 0);
    Ok(())
}

#[test]
fn test_enable_requires_credit_reset() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);

    ctl.configure(0, 7, params)?;
    let err = ctl.enable(0, 7).unwrap_err();
    assert!(matches!(err, CbsError::Invalid(_)));
    assert_eq!(ctl.tc_state(0, 7), TcState::Configuring);

    // No control-word write happened, so the enable bit is still clear.
    assert_eq!(io.get(ctl.topology().ctrl_reg(0)), 0);
    Ok(())
}

#[test]
fn test_enable_unconfigured_rejected() {
    let (mut ctl, _io) = test_ctl(ChipModel::Lan9692);
    assert!(matches!(ctl.enable(0, 7), Err(CbsError::Invalid(_))));
}

#[test]
fn test_disable_enable_round_trip() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);

    ctl.configure(2, 7, params)?;
    ctl.reset_credits(2)?;
    ctl.enable(2, 7)?;

    let topo = ctl.topology();
    let snapshot = [
        io.get(topo.idle_slope_reg(2, 0)),
        io.get(topo.send_slope_reg(2, 0)),
        io.get(topo.hi_credit_reg(2, 0)),
        io.get(topo.lo_credit_reg(2, 0)),
        io.get(topo.ctrl_reg(2)),
    ];

    ctl.disable(2, 7)?;
    assert_eq!(ctl.tc_state(2, 7), TcState::Disabled);
    assert_eq!(
        io.get(ctl.topology().ctrl_reg(2)) & regs::ctrl_group_enable(0),
        0
    );

    // Re-enabling without an intervening configure restores the identical
    // register contents.
    ctl.enable(2, 7)?;
    let topo = ctl.topology();
    let after = [
        io.get(topo.idle_slope_reg(2, 0)),
        io.get(topo.send_slope_reg(2, 0)),
        io.get(topo.hi_credit_reg(2, 0)),
        io.get(topo.lo_credit_reg(2, 0)),
        io.get(topo.ctrl_reg(2)),
    ];
    assert_eq!(snapshot, after);
    Ok(())
}

#[test]
fn test_disable_is_idempotent() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);

    // Disabling a class that was never configured writes nothing.
    ctl.disable(0, 7)?;
    assert_eq!(io.write_count(), 0);

    let params = video_params(&ctl);
    ctl.configure(0, 7, params)?;
    ctl.reset_credits(0)?;
    ctl.enable(0, 7)?;
    ctl.disable(0, 7)?;
    let writes = io.write_count();
    ctl.disable(0, 7)?;
    assert_eq!(io.write_count(), writes);
    Ok(())
}

#[test]
fn test_reset_credits_touches_only_ctrl() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);
    ctl.configure(3, 7, params)?;

    let topo = ctl.topology();
    let ctrl = topo.ctrl_reg(3);
    let slopes = [
        topo.idle_slope_reg(3, 0),
        topo.send_slope_reg(3, 0),
        topo.hi_credit_reg(3, 0),
        topo.lo_credit_reg(3, 0),
    ];
    let before: Vec<u32> = slopes.iter().map(|a| io.get(*a)).collect();
    let ctrl_before = io.get(ctrl);
    let mark = io.write_count();

    ctl.reset_credits(3)?;

    let after: Vec<u32> = slopes.iter().map(|a| io.get(*a)).collect();
    assert_eq!(before, after);
    // The pulse is two control-word writes: bit set, then bit cleared,
    // ending where it started.
    assert_eq!(io.get(ctrl), ctrl_before);
    assert_eq!(
        &io.write_log()[mark..],
        &[
            (ctrl, ctrl_before | regs::CTRL_CREDIT_RESET),
            (ctrl, ctrl_before & !regs::CTRL_CREDIT_RESET),
        ]
    );
    Ok(())
}

#[test]
fn test_mid_sequence_failure_leaves_disabled() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);

    // Let the idle- and send-slope writes land, then fail.
    io.fail_writes_after(2);
    let err = ctl.configure(0, 7, params).unwrap_err();
    assert!(matches!(err, CbsError::Backend(_)));
    assert_eq!(ctl.tc_state(0, 7), TcState::Disabled);

    // The enable bit was never written; the first two registers keep their
    // last-written values.
    let topo = ctl.topology();
    assert_eq!(io.get(topo.ctrl_reg(0)), 0);
    assert_eq!(io.get(topo.idle_slope_reg(0, 0)), 25_000_000);
    assert_eq!(io.get(topo.hi_credit_reg(0, 0)), 0);
    Ok(())
}

#[test]
fn test_reconfigure_replaces_reservation() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let speed = ctl.topology().port_speed().bps();
    let frame = ctl.topology().max_frame_size();

    let first = ShaperParams::for_bandwidth(25_000_000, speed, frame)?;
    ctl.configure(1, 7, first)?;
    ctl.reset_credits(1)?;
    ctl.enable(1, 7)?;

    let second = ShaperParams::for_bandwidth(8_000_000, speed, frame)?;
    ctl.reconfigure(1, 7, second)?;

    assert_eq!(ctl.tc_state(1, 7), TcState::Enabled);
    let topo = ctl.topology();
    assert_eq!(io.get(topo.idle_slope_reg(1, 0)), 8_000_000);
    assert_eq!(io.get(topo.send_slope_reg(1, 0)), 992_000_000);
    assert_ne!(io.get(topo.ctrl_reg(1)) & regs::ctrl_group_enable(0), 0);
    Ok(())
}

#[test]
fn test_reconfigure_failure_leaves_disabled() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);
    ctl.configure(1, 7, params)?;
    ctl.reset_credits(1)?;
    ctl.enable(1, 7)?;

    // The disable write succeeds; the first slope write of the new
    // configuration does not.
    io.fail_writes_after(1);
    let err = ctl.reconfigure(1, 7, params).unwrap_err();
    assert!(matches!(err, CbsError::Backend(_)));

    assert_eq!(ctl.tc_state(1, 7), TcState::Disabled);
    assert_eq!(
        io.get(ctl.topology().ctrl_reg(1)) & regs::ctrl_group_enable(0),
        0
    );
    Ok(())
}

#[test]
fn test_group_exhaustion_leaves_port_untouched() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);

    ctl.configure(0, 7, params)?;
    ctl.configure(0, 6, params)?;
    let writes = io.write_count();

    let err = ctl.configure(0, 5, params).unwrap_err();
    assert!(matches!(
        err,
        CbsError::GroupExhausted { port: 0, tc: 5 }
    ));
    assert_eq!(io.write_count(), writes);
    assert_eq!(ctl.tc_state(0, 7), TcState::Configuring);
    assert_eq!(ctl.tc_state(0, 6), TcState::Configuring);
    Ok(())
}

#[test]
fn test_invalid_bounds_write_nothing() {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);

    // Port 12 and traffic class 8 are both one past the end on this model.
    assert!(matches!(
        ctl.configure(12, 7, params),
        Err(CbsError::Invalid(_))
    ));
    assert!(matches!(
        ctl.configure(0, 8, params),
        Err(CbsError::Invalid(_))
    ));
    assert!(matches!(ctl.reset_credits(12), Err(CbsError::Invalid(_))));
    assert!(matches!(ctl.status(12), Err(CbsError::Invalid(_))));
    assert_eq!(io.write_count(), 0);
}

#[test]
fn test_unbound_handle_rejected() {
    let log = common::logging::init(
        "test",
        &None,
        common::logging::LogFormat::Human,
    )
    .unwrap();
    let mut ctl = ShaperCtl::new(ChipTopology::new(ChipModel::Lan9692), &log);
    let params = ShaperParams::for_bandwidth(25_000_000, GBPS, 1522).unwrap();

    assert!(matches!(
        ctl.configure(0, 7, params),
        Err(CbsError::NotInitialized)
    ));
    assert!(matches!(ctl.status(0), Err(CbsError::NotInitialized)));
    assert!(matches!(ctl.dump(0), Err(CbsError::NotInitialized)));
}

#[test]
fn test_double_bind_rejected() {
    let (mut ctl, _io) = test_ctl(ChipModel::Lan9692);
    let second = MemIo::new();
    assert!(matches!(
        ctl.bind(Box::new(second)),
        Err(CbsError::Invalid(_))
    ));
}

#[test]
fn test_status_and_dump_read_back() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);
    ctl.configure(4, 7, params)?;
    ctl.reset_credits(4)?;
    ctl.enable(4, 7)?;

    io.seed(ctl.topology().status_reg(4), 0x0000_0a0a);
    assert_eq!(ctl.status(4)?, 0x0000_0a0a);

    let writes = io.write_count();
    let dump = ctl.dump(4)?;
    assert_eq!(dump.port, 4);
    assert_eq!(dump.status, 0x0000_0a0a);
    assert_eq!(dump.groups.len(), 2);
    assert_eq!(dump.groups[0].idle_slope_bps, 25_000_000);
    assert_eq!(dump.groups[0].lo_credit_bytes, 1483);
    assert!(dump.groups[0].enabled);
    assert!(!dump.groups[1].enabled);
    // Diagnostics never write.
    assert_eq!(io.write_count(), writes);
    Ok(())
}

#[test]
fn test_shutdown_reaches_terminal_state() -> Result<()> {
    let (mut ctl, io) = test_ctl(ChipModel::Lan9662);
    let speed = ctl.topology().port_speed().bps();
    let frame = ctl.topology().max_frame_size();

    for (tc, bw) in [(7u8, 25_000_000u64), (6, 8_000_000)] {
        let params = ShaperParams::for_bandwidth(bw, speed, frame)?;
        ctl.configure(10, tc, params)?;
    }
    ctl.reset_credits(10)?;
    ctl.enable(10, 7)?;
    ctl.enable(10, 6)?;

    let ctrl = ctl.topology().ctrl_reg(10);
    ctl.shutdown()?;

    // Both enable bits cleared, nothing shaping, backend gone.
    assert_eq!(
        io.get(ctrl)
            & (regs::ctrl_group_enable(0) | regs::ctrl_group_enable(1)),
        0
    );
    assert_eq!(ctl.tc_state(10, 7), TcState::Disabled);
    let params = ShaperParams::for_bandwidth(25_000_000, speed, frame)?;
    assert!(matches!(
        ctl.configure(10, 7, params),
        Err(CbsError::NotInitialized)
    ));
    Ok(())
}

#[test]
fn test_enabled_class_must_reconfigure() -> Result<()> {
    let (mut ctl, _io) = test_ctl(ChipModel::Lan9692);
    let params = video_params(&ctl);
    ctl.configure(0, 7, params)?;
    ctl.reset_credits(0)?;
    ctl.enable(0, 7)?;

    assert!(matches!(
        ctl.configure(0, 7, params),
        Err(CbsError::Invalid(_))
    ));
    assert_eq!(ctl.tc_state(0, 7), TcState::Enabled);
    Ok(())
}
