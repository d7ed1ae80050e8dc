//! Help system for settle commands and file formats.

pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => {
            if let Some(text) = command_help(t) {
                return text;
            }
            if let Some(text) = group_help(t) {
                return text;
            }
            format!("Unknown help topic: '{}'. Run 'settle topics' for a list of topics.", t)
        }
    }
}


fn overview() -> String {
    "\
settle — order-stable relabeling of a live item tree

Usage: settle [--config <path>] [-v] <command> [args...]

Commands:
  replay <trace> [--show <view>]   Replay a recorded trace and print the result
  config                           Print the effective settings
  topics [topic]                   Show help on a topic

Views (replay --show):
  labels      Item display text after the final pass (default)
  snapshot    Published snapshot as JSON
  export      id|period , range|annotation lines
  commits     One line per committed pass
  status      Scheduler state as JSON

Topics:
  trace       Trace file format
  settings    Settings file format
  export      Export line format

Run 'settle topics <topic>' for details."
        .into()
}


fn group_help(group: &str) -> Option<String> {
    let text = match group {
        "trace" => "\
Trace files — a recorded tree and a timeline of changes (YAML or JSON)

  tree:
    - name: list
      children:
        - { name: a, class: <item marker>, text: \"Set 1, 9:05 - 9:40\" }
  events:
    - { at_ms: 100, op: move, node: a, before: b }
    - { at_ms: 150, op: append, parent: list, node: { name: c, class: <item marker> } }
    - { at_ms: 200, op: remove, node: b }
    - { at_ms: 250, op: set_text, node: a, text: \"...\" }
    - { at_ms: 900, op: relabel_now }
  annotations: [\"first note\", \"second note\"]

  Events must be in time order. Replay starts monitoring at 0ms and runs
  until no timer is pending after the last event.",

        "settings" => "\
Settings — optional YAML file, every field has a default

  item_marker: video-playlist-episode-title-text
  quiet_period_ms: 700       quiet time before a relabel
  initial_ceiling_ms: 7000   latest first relabel after start
  grace_ms: 80               echo window after a relabel
  max_ancestor_depth: 10     ancestor levels that vote for the container

  Looked up at --config, then $SETTLE_CONFIG_DIR/settings.yaml, then
  <config dir>/settle/settings.yaml.",

        "export" => "\
Export — one line per item in final order

  <id>|<period> , <range>|<annotation>

  The middle column holds only the period or only the range when the other
  is empty, and is empty when both are.",

        _ => return None,
    };
    Some(text.into())
}


fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "replay" => "settle replay — replay a trace\n\nUsage: settle replay <trace> [--show <view>] [--annotations <file>]",
        "config" => "settle config — print effective settings\n\nUsage: settle config",
        "topics" => "settle topics — show help\n\nUsage: settle topics [topic]",
        "status" => "status — scheduler state, item count and commit count as JSON",
        "snapshot" => "snapshot — the published snapshot as a JSON array",
        "labels" => "labels — current display text of every item, one per line",
        "relabel.now" => "relabel.now — relabel immediately, bypassing the quiet period (refused while stopped)",
        _ => return None,
    };
    Some(text.into())
}
