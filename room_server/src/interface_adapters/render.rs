// Markup fragments for htmx consumers. Every fragment carries hx-swap-oob so
// the client can place it without knowing the event type.

use maud::{Markup, html};

use crate::domain::events::{
    AnswerSubmitted, BadgeUpdate, CategoriesUpdated, GuestAccepted, JoinRequestNotice,
    QuestionDrawn, ReadyState, RequestResolution, RoomSnapshot, StatusBadge,
};
use crate::domain::{AnswerAction, FragmentRenderer, RenderError, RoomEvent, RoomStatus, SwapHint};

#[derive(Debug, Clone, Copy, Default)]
pub struct MaudRenderer;

impl FragmentRenderer for MaudRenderer {
    fn render(&self, event: &RoomEvent) -> Result<String, RenderError> {
        let template = event.template();
        let markup = match event {
            RoomEvent::RoomUpdated(room) => room_panel(room),
            RoomEvent::ReadyStateChanged(ready) => ready_button(ready),
            RoomEvent::StatusChanged(badge) => status_badge(badge),
            RoomEvent::JoinRequested(notice) => join_request_item(notice),
            RoomEvent::GuestAccepted(accepted) => guest_info(accepted),
            RoomEvent::RequestAccepted(resolution) => {
                let path = resolution.redirect.as_deref().ok_or(RenderError {
                    template,
                    reason: "accepted request has no redirect".to_string(),
                })?;
                redirect(path)
            }
            RoomEvent::RequestRejected(resolution) => request_rejected(resolution),
            RoomEvent::CategoriesUpdated(categories) => category_list(categories),
            RoomEvent::QuestionDrawn(question) => question_card(question),
            RoomEvent::AnswerSubmitted(answer) => answer_panel(answer),
            RoomEvent::GameStarted(started) => redirect(&started.redirect),
            RoomEvent::GameFinished(finished) => redirect(&finished.redirect),
            RoomEvent::BadgeUpdated(badge) => request_badge(badge),
            RoomEvent::PlayerTyping(_) => typing_indicator(),
            RoomEvent::RoomDeleted(_) => room_removed(),
        };
        Ok(markup.into_string())
    }
}

fn oob(swap: SwapHint, target: &str) -> String {
    format!("{}:{}", swap.as_str(), target)
}

fn status_label(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Waiting => "Waiting for a guest",
        RoomStatus::Ready => "Ready",
        RoomStatus::Playing => "Playing",
        RoomStatus::Finished => "Finished",
    }
}

fn room_panel(room: &RoomSnapshot) -> Markup {
    html! {
        section id="room-panel" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            data-room-id=(room.room_id) data-status=(room.status.as_str()) {
            p class="room-owner" { "Host: " (room.owner_id) }
            @match room.guest_id {
                Some(guest) => {
                    p class="room-guest" { "Guest: " (guest) }
                }
                None => {
                    p class="room-guest empty" { "Waiting for someone to join" }
                }
            }
            p class="room-status" { (status_label(room.status)) }
            p class="room-progress" { (room.question_ordinal) " / " (room.max_questions) }
        }
    }
}

fn ready_button(ready: &ReadyState) -> Markup {
    html! {
        button id="ready-button" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            data-guest-id=(ready.guest_id) disabled[ready.guest_ready] {
            @if ready.guest_ready { "Ready" } @else { "I'm ready" }
        }
    }
}

fn status_badge(badge: &StatusBadge) -> Markup {
    html! {
        span id="room-status" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            class={ "badge badge-" (badge.status.as_str()) } {
            (status_label(badge.status))
            @if badge.guest_ready { " (guest ready)" }
        }
    }
}

fn join_request_item(notice: &JoinRequestNotice) -> Markup {
    html! {
        div hx-swap-oob=(oob(SwapHint::BeforeEnd, "#join-requests")) {
            div id={ "join-request-" (notice.request_id) } class="join-request" {
                span class="requester" { "Player " (notice.requester_id) }
                @if let Some(message) = &notice.message {
                    q class="message" { (message) }
                }
                button hx-post={ "/join-requests/" (notice.request_id) "/accept" } { "Accept" }
                button hx-post={ "/join-requests/" (notice.request_id) "/reject" } { "Decline" }
            }
        }
    }
}

fn guest_info(accepted: &GuestAccepted) -> Markup {
    html! {
        div id="guest-info" hx-swap-oob=(SwapHint::OuterHtml.as_str()) data-guest-id=(accepted.guest_id) {
            "Player " (accepted.guest_id) " joined"
        }
    }
}

fn redirect(path: &str) -> Markup {
    html! {
        div class="redirect" data-redirect=(path) hx-get=(path) hx-trigger="load" hx-target="body" hx-push-url="true" {
            a href=(path) { "Continue" }
        }
    }
}

fn request_rejected(resolution: &RequestResolution) -> Markup {
    html! {
        div id="join-status" hx-swap-oob=(SwapHint::OuterHtml.as_str()) data-room-id=(resolution.room_id) {
            "Your request to join was declined."
        }
    }
}

fn category_list(categories: &CategoriesUpdated) -> Markup {
    html! {
        ul id="categories" hx-swap-oob=(SwapHint::OuterHtml.as_str()) {
            @for category in &categories.category_ids {
                li data-category-id=(category) class="selected" { "Category " (category) }
            }
            @if categories.category_ids.is_empty() {
                li class="empty" { "No categories selected" }
            }
        }
    }
}

fn question_card(question: &QuestionDrawn) -> Markup {
    html! {
        article id="question-card" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            data-question-id=(question.question_id) data-turn=(question.current_turn) {
            header { "Question " (question.ordinal) }
            p class="question-text" { (question.text) }
        }
    }
}

fn answer_panel(answer: &AnswerSubmitted) -> Markup {
    html! {
        div id="answer-panel" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            data-question-id=(answer.question_id) data-turn=(answer.current_turn) {
            @match answer.action {
                AnswerAction::Answered => {
                    p class="answer-author" { "Player " (answer.author_id) " answered:" }
                    blockquote { (answer.text) }
                }
                AnswerAction::Skipped => {
                    p class="answer-author" { "Player " (answer.author_id) " skipped this one." }
                }
            }
        }
    }
}

fn request_badge(badge: &BadgeUpdate) -> Markup {
    html! {
        span id="request-badge" hx-swap-oob=(SwapHint::OuterHtml.as_str())
            class=(if badge.pending_requests == 0 { "badge hidden" } else { "badge" }) {
            (badge.pending_requests)
        }
    }
}

fn typing_indicator() -> Markup {
    html! {
        span hx-swap-oob=(oob(SwapHint::InnerHtml, "#typing-indicator")) class="typing" { "typing…" }
    }
}

fn room_removed() -> Markup {
    html! {
        section id="room-panel" hx-swap-oob=(SwapHint::OuterHtml.as_str()) class="room-removed" {
            p { "This room was closed by its host." }
            a href="/" { "Back to lobby" }
        }
    }
}
