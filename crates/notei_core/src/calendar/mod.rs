//! Calendar engines: iCalendar interchange and day-view layout.
//!
//! Both are pure and synchronous; callers pass a `TimeContext` wherever a
//! local date is involved.

pub mod ics;
pub mod layout;

pub use ics::{
    decode_calendar_text, decode_calendar_text_with, encode_calendar_events,
    encode_calendar_events_with, DecodeIssue, DecodeReport, ParsedIcsEvent,
};
pub use layout::{layout_day, LayoutSlot, TimeRange};
