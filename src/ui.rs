//! Session control overlay
//!
//! A single egui button at the bottom centre of the screen that enters and
//! leaves immersive presentation.

use egui::{Color32, Context, FontFamily, FontId, Margin, Rounding, Stroke, Style, Visuals};

use crate::frame_driver::PresentationState;

/// What the user asked the session control for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIntent {
    Enter,
    Exit,
}

pub const LABEL_ENTER: &str = "ENTER VR";
pub const LABEL_EXIT: &str = "EXIT VR";
pub const LABEL_UNSUPPORTED: &str = "VR NOT SUPPORTED";

/// Button text for the current presentation
pub fn session_label(state: PresentationState, supported: bool) -> &'static str {
    match (supported, state) {
        (false, _) => LABEL_UNSUPPORTED,
        (true, PresentationState::PresentingImmersive) => LABEL_EXIT,
        (true, _) => LABEL_ENTER,
    }
}

pub struct SessionButton {
    supported: bool,
}

impl SessionButton {
    pub fn new(ctx: &Context, supported: bool) -> Self {
        Self::apply_theme(ctx);
        Self { supported }
    }

    fn apply_theme(ctx: &Context) {
        let mut style = Style::default();
        style.spacing.button_padding = egui::vec2(12.0, 12.0);
        style
            .text_styles
            .insert(egui::TextStyle::Button, FontId::new(18.0, FontFamily::Proportional));

        let mut visuals = Visuals::dark();
        visuals.widgets.inactive.rounding = Rounding::same(12.0);
        visuals.widgets.hovered.rounding = Rounding::same(12.0);
        visuals.widgets.active.rounding = Rounding::same(12.0);
        visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 50);
        visuals.widgets.active.bg_fill = Color32::from_rgb(100, 180, 255);

        ctx.set_style(style);
        ctx.set_visuals(visuals);
    }

    /// Draw the control; returns the intent when it was clicked this frame
    pub fn show(&self, ctx: &Context, state: PresentationState) -> Option<SessionIntent> {
        let label = session_label(state, self.supported);
        let mut intent = None;

        egui::Window::new("Session")
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -20.0))
            .resizable(false)
            .collapsible(false)
            .title_bar(false)
            .frame(
                egui::Frame::window(&ctx.style())
                    .inner_margin(Margin::same(6.0))
                    .rounding(Rounding::same(16.0))
                    .fill(Color32::from_black_alpha(160))
                    .stroke(Stroke::new(1.0, Color32::from_gray(200))),
            )
            .show(ctx, |ui| {
                let button = egui::Button::new(egui::RichText::new(label).strong()).min_size(egui::vec2(150.0, 40.0));
                let clicked = ui.add_enabled(self.supported, button).clicked();
                if clicked {
                    intent = Some(match state {
                        PresentationState::PresentingImmersive => SessionIntent::Exit,
                        _ => SessionIntent::Enter,
                    });
                }
            });

        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_state() {
        assert_eq!(session_label(PresentationState::Presenting2d, true), "ENTER VR");
        assert_eq!(session_label(PresentationState::Idle, true), "ENTER VR");
        assert_eq!(session_label(PresentationState::PresentingImmersive, true), "EXIT VR");
        assert_eq!(session_label(PresentationState::Presenting2d, false), "VR NOT SUPPORTED");
    }

    #[test]
    fn no_intent_without_input() {
        let ctx = Context::default();
        let button = SessionButton::new(&ctx, true);
        let mut intent = Some(SessionIntent::Exit);
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            intent = button.show(ctx, PresentationState::Presenting2d);
        });
        assert_eq!(intent, None);
    }
}
