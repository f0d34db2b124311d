//! Menu transition table.
//!
//! Pure: given the current state and the inbound text, pick the next state and the effects to
//! run. Rules are evaluated top to bottom and the first whose guard matches wins; main-menu
//! dispatch is the fallback when none does.

use super::state::ConversationState;

/// Hotkey that returns to the main menu from any state, including a pause.
pub const MENU_HOTKEY: &str = "5";
/// Hotkey that closes the conversation.
pub const CLOSE_HOTKEY: &str = "6";

/// What the engine knows about one inbound message when deciding.
#[derive(Debug, Clone, Copy)]
pub struct Inbound<'a> {
    pub state: Option<ConversationState>,
    /// Trimmed message text.
    pub body: &'a str,
    pub is_group_traffic: bool,
}

/// Canned reply kinds; text is rendered by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Welcome,
    Menu,
    Closing,
    EquipmentChecklist,
    SystemTopics,
    CalibrationChooser,
    WellInstructions,
    RiverInstructions,
    /// Echo of the chosen system topic.
    TopicAck(String),
    /// Tells the customer when the bot resumes.
    PauseNotice,
}

/// Side effects, run in order after the state is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Typing indicator followed by the typing delay.
    Typing,
    /// Gap between the welcome text and the menu.
    WelcomePause,
    Send(Reply),
    /// Alert every support contact.
    Escalate,
    /// Arm the deferred pause release.
    ArmRelease,
    /// Drop a pending pause release (the guard would neutralize it anyway).
    CancelRelease,
}

/// Outcome of the table for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Name of the rule that matched.
    pub rule: &'static str,
    /// New state; `None` leaves the session untouched.
    pub next: Option<ConversationState>,
    pub effects: Vec<Effect>,
}

impl Decision {
    fn ignore(rule: &'static str) -> Self {
        Self {
            rule,
            next: None,
            effects: Vec::new(),
        }
    }

    fn to(rule: &'static str, next: ConversationState) -> Self {
        Self {
            rule,
            next: Some(next),
            effects: Vec::new(),
        }
    }

    fn keep(rule: &'static str) -> Self {
        Self::ignore(rule)
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn send(self, reply: Reply) -> Self {
        self.with(Effect::Send(reply))
    }
}

struct Rule {
    name: &'static str,
    applies: fn(&Inbound<'_>) -> bool,
    decide: fn(&Inbound<'_>) -> Decision,
}

/// Ordered rules; see [`decide`].
const RULES: &[Rule] = &[
    Rule {
        name: "group_traffic",
        applies: |i| i.is_group_traffic,
        decide: |_| Decision::ignore("group_traffic"),
    },
    Rule {
        name: "pause_gate",
        applies: |i| i.state == Some(ConversationState::Paused) && i.body != MENU_HOTKEY,
        decide: |_| Decision::ignore("pause_gate"),
    },
    Rule {
        name: "hotkey_menu",
        applies: |i| i.body == MENU_HOTKEY,
        decide: |_| {
            Decision::to("hotkey_menu", ConversationState::Menu)
                .with(Effect::CancelRelease)
                .with(Effect::Typing)
                .send(Reply::Menu)
        },
    },
    Rule {
        name: "hotkey_close",
        applies: |i| i.body == CLOSE_HOTKEY,
        decide: |_| Decision::to("hotkey_close", ConversationState::Closed).send(Reply::Closing),
    },
    Rule {
        name: "fresh_session",
        applies: |i| matches!(i.state, None | Some(ConversationState::Closed)),
        decide: |_| {
            Decision::to("fresh_session", ConversationState::Menu)
                .with(Effect::Typing)
                .send(Reply::Welcome)
                .with(Effect::WelcomePause)
                .send(Reply::Menu)
        },
    },
    Rule {
        name: "calibration_choice",
        applies: |i| {
            i.state == Some(ConversationState::CalibrationMenu) && matches!(i.body, "1" | "2")
        },
        decide: |i| {
            if i.body == "1" {
                Decision::to("calibration_choice", ConversationState::CalibrationWell)
                    .send(Reply::WellInstructions)
            } else {
                Decision::to("calibration_choice", ConversationState::CalibrationRiver)
                    .send(Reply::RiverInstructions)
            }
        },
    },
    Rule {
        name: "calibration_reentry",
        applies: |i| {
            matches!(
                (i.body, i.state),
                ("1", Some(ConversationState::CalibrationWell))
                    | ("2", Some(ConversationState::CalibrationRiver))
            )
        },
        decide: |_| {
            Decision::to("calibration_reentry", ConversationState::CalibrationMenu)
                .send(Reply::CalibrationChooser)
        },
    },
    Rule {
        name: "system_topic_ack",
        applies: |i| i.state == Some(ConversationState::SystemTopic),
        decide: |i| {
            Decision::to("system_topic_ack", ConversationState::Menu)
                .send(Reply::TopicAck(i.body.to_string()))
        },
    },
];

/// Main-menu dispatch: the default for `Menu` and any state no rule claimed.
fn main_menu(i: &Inbound<'_>) -> Decision {
    match i.body {
        "1" => Decision::to("main_menu", ConversationState::Menu).send(Reply::EquipmentChecklist),
        "2" => Decision::to("main_menu", ConversationState::SystemTopic).send(Reply::SystemTopics),
        "3" => Decision::to("main_menu", ConversationState::CalibrationMenu)
            .send(Reply::CalibrationChooser),
        "4" => Decision::to("main_menu", ConversationState::Paused)
            .send(Reply::PauseNotice)
            .with(Effect::Escalate)
            .with(Effect::ArmRelease),
        _ => Decision::keep("main_menu").send(Reply::Menu),
    }
}

/// Apply the table to one message.
pub fn decide(input: &Inbound<'_>) -> Decision {
    RULES
        .iter()
        .find(|rule| (rule.applies)(input))
        .map_or_else(|| main_menu(input), |rule| (rule.decide)(input))
}

/// Rule names in evaluation order, ending with the fallback.
pub fn rule_names() -> Vec<&'static str> {
    RULES
        .iter()
        .map(|r| r.name)
        .chain(std::iter::once("main_menu"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationState::*;

    fn run(state: Option<ConversationState>, body: &str) -> Decision {
        decide(&Inbound {
            state,
            body,
            is_group_traffic: false,
        })
    }

    fn replies(d: &Decision) -> Vec<Reply> {
        d.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn evaluation_order_is_fixed() {
        assert_eq!(
            rule_names(),
            vec![
                "group_traffic",
                "pause_gate",
                "hotkey_menu",
                "hotkey_close",
                "fresh_session",
                "calibration_choice",
                "calibration_reentry",
                "system_topic_ack",
                "main_menu",
            ]
        );
    }

    #[test]
    fn group_traffic_is_ignored_in_every_state() {
        for state in ConversationState::ALL.map(Some).into_iter().chain([None]) {
            let d = decide(&Inbound {
                state,
                body: "5",
                is_group_traffic: true,
            });
            assert_eq!(d, Decision::ignore("group_traffic"));
        }
    }

    #[test]
    fn menu_hotkey_from_any_unpaused_state_sends_one_menu() {
        for state in ConversationState::ALL
            .map(Some)
            .into_iter()
            .chain([None])
            .filter(|s| *s != Some(Paused))
        {
            let d = run(state, "5");
            assert_eq!(d.next, Some(Menu), "from {:?}", state);
            assert_eq!(replies(&d), vec![Reply::Menu], "from {:?}", state);
        }
    }

    #[test]
    fn paused_swallows_everything_but_menu_hotkey() {
        for body in ["1", "2", "3", "4", "6", "oi", ""] {
            let d = run(Some(Paused), body);
            assert_eq!(d, Decision::ignore("pause_gate"), "body {:?}", body);
        }
        let d = run(Some(Paused), "5");
        assert_eq!(d.next, Some(Menu));
        assert_eq!(
            d.effects,
            vec![Effect::CancelRelease, Effect::Typing, Effect::Send(Reply::Menu)]
        );
    }

    #[test]
    fn close_hotkey_closes() {
        let d = run(Some(CalibrationWell), "6");
        assert_eq!(d.next, Some(Closed));
        assert_eq!(replies(&d), vec![Reply::Closing]);
    }

    #[test]
    fn new_or_closed_gets_welcome_then_menu() {
        for state in [None, Some(Closed)] {
            for body in ["oi", "3", "4", ""] {
                let d = run(state, body);
                assert_eq!(d.rule, "fresh_session");
                assert_eq!(d.next, Some(Menu));
                assert_eq!(
                    d.effects,
                    vec![
                        Effect::Typing,
                        Effect::Send(Reply::Welcome),
                        Effect::WelcomePause,
                        Effect::Send(Reply::Menu),
                    ]
                );
            }
        }
    }

    #[test]
    fn main_menu_dispatch() {
        let d = run(Some(Menu), "1");
        assert_eq!((d.next, replies(&d)), (Some(Menu), vec![Reply::EquipmentChecklist]));
        let d = run(Some(Menu), "2");
        assert_eq!((d.next, replies(&d)), (Some(SystemTopic), vec![Reply::SystemTopics]));
        let d = run(Some(Menu), "3");
        assert_eq!(
            (d.next, replies(&d)),
            (Some(CalibrationMenu), vec![Reply::CalibrationChooser])
        );
        let d = run(Some(Menu), "4");
        assert_eq!(d.next, Some(Paused));
        assert_eq!(
            d.effects,
            vec![
                Effect::Send(Reply::PauseNotice),
                Effect::Escalate,
                Effect::ArmRelease
            ]
        );
        let d = run(Some(Menu), "bom dia");
        assert_eq!((d.next, replies(&d)), (None, vec![Reply::Menu]));
    }

    #[test]
    fn calibration_sub_menu_and_reentry() {
        let d = run(Some(CalibrationMenu), "1");
        assert_eq!((d.next, replies(&d)), (Some(CalibrationWell), vec![Reply::WellInstructions]));
        let d = run(Some(CalibrationMenu), "2");
        assert_eq!(
            (d.next, replies(&d)),
            (Some(CalibrationRiver), vec![Reply::RiverInstructions])
        );
        let d = run(Some(CalibrationWell), "1");
        assert_eq!(
            (d.next, replies(&d)),
            (Some(CalibrationMenu), vec![Reply::CalibrationChooser])
        );
        let d = run(Some(CalibrationRiver), "2");
        assert_eq!(d.rule, "calibration_reentry");
        assert_eq!(d.next, Some(CalibrationMenu));
    }

    #[test]
    fn unmatched_calibration_input_falls_through_to_main_menu() {
        let d = run(Some(CalibrationMenu), "4");
        assert_eq!(d.rule, "main_menu");
        assert_eq!(d.next, Some(Paused));
        let d = run(Some(CalibrationWell), "2");
        assert_eq!(d.rule, "main_menu");
        assert_eq!(d.next, Some(SystemTopic));
        let d = run(Some(CalibrationMenu), "x");
        assert_eq!((d.next, replies(&d)), (None, vec![Reply::Menu]));
    }

    #[test]
    fn system_topic_acknowledges_any_choice() {
        for body in ["1", "2", "3", "qualquer"] {
            let d = run(Some(SystemTopic), body);
            assert_eq!(d.next, Some(Menu));
            assert_eq!(replies(&d), vec![Reply::TopicAck(body.to_string())]);
        }
    }

    #[test]
    fn equipment_option_is_idempotent() {
        let first = run(Some(Menu), "1");
        for _ in 0..3 {
            assert_eq!(run(first.next, "1"), first);
        }
    }
}
