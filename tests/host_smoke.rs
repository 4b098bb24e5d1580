#![cfg(all(unix, not(target_os = "macos")))]

use lv2bridge::{ControlGroup, Lv2Context, Processor};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn first_hostable_uri(ctx: &Lv2Context) -> Option<String> {
    ctx.list_plugins().into_iter().next().map(|info| info.uri)
}

#[test]
fn discovery_lists_only_hostable_plugins() {
    init_logging();
    let ctx = Lv2Context::with_defaults(48_000.0);
    for info in ctx.list_plugins() {
        assert!(!info.uri.is_empty());
        let check = ctx.validate(&info.uri).expect("listed plugin validates");
        assert!(!check.is_blocked());
    }
}

#[test]
fn instantiate_first_plugin_smoke() {
    init_logging();
    let ctx = Lv2Context::with_defaults(48_000.0);
    let Some(uri) = first_hostable_uri(&ctx) else {
        eprintln!("No LV2 plugin found; skipping");
        return;
    };
    eprintln!("Loading LV2 plugin: {uri}");
    let processor = Processor::new(&ctx, &uri).expect("LV2 load failed");
    assert!(processor.host_channels() >= 1);
    eprintln!("Instantiated '{}'", processor.name());
}

#[test]
fn group_runs_a_cycle_and_snapshots() {
    init_logging();
    let ctx = Lv2Context::with_defaults(48_000.0);
    let Some(uri) = first_hostable_uri(&ctx) else {
        eprintln!("No LV2 plugin found; skipping");
        return;
    };

    let mut group = ControlGroup::new(&ctx, &uri, 2).expect("failed to build group");
    let frames = 256;
    let host_in = vec![0.0f32; frames * group.channels()];
    let mut host_out = vec![0.0f32; frames * group.channels()];
    group.run(&host_in, &mut host_out, frames);

    let settings = group.save_settings();
    assert_eq!(settings.channels.len(), group.procs().len());
    group
        .apply_settings(&settings)
        .expect("own settings reapply");
}
