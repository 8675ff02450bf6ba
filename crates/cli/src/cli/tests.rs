use clap::Parser;

use super::*;

#[test]
fn parse_list_defaults() {
	let cli = Cli::try_parse_from(["rterm", "list"]).unwrap();
	assert!(matches!(cli.command, Commands::List));
	assert_eq!(cli.format, OutputFormat::Text);
	assert_eq!(cli.verbose, 0);
	assert_eq!(cli.server.timeout, 30);
	assert!(!cli.server.no_token_query);
}

#[test]
fn parse_new_with_options() {
	let cli = Cli::try_parse_from(["rterm", "-f", "json", "new", "--name", "dev", "--cwd", "/srv"]).unwrap();
	assert_eq!(cli.format, OutputFormat::Json);
	match cli.command {
		Commands::New(args) => {
			assert_eq!(args.name.as_deref(), Some("dev"));
			assert_eq!(args.cwd.as_deref(), Some("/srv"));
		}
		_ => panic!("Expected New command"),
	}
}

#[test]
fn parse_global_flags_after_subcommand() {
	let cli = Cli::try_parse_from([
		"rterm",
		"shutdown",
		"3",
		"--base-url",
		"https://example.com/api/",
		"--token",
		"abc",
		"-vv",
	])
	.unwrap();
	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.server.base_url, "https://example.com/api/");
	assert_eq!(cli.server.token.as_deref(), Some("abc"));
	match cli.command {
		Commands::Shutdown(args) => assert_eq!(args.name, "3"),
		_ => panic!("Expected Shutdown command"),
	}
}

#[test]
fn parse_send() {
	let cli = Cli::try_parse_from(["rterm", "send", "1", "ls -la", "--no-enter"]).unwrap();
	match cli.command {
		Commands::Send(args) => {
			assert_eq!(args.name, "1");
			assert_eq!(args.text, "ls -la");
			assert!(args.no_enter);
			assert_eq!(args.linger, 250);
		}
		_ => panic!("Expected Send command"),
	}
}

#[test]
fn parse_attach_size() {
	let cli = Cli::try_parse_from(["rterm", "attach", "1", "--size", "24x80"]).unwrap();
	match cli.command {
		Commands::Attach(args) => assert_eq!(args.size, Some((24, 80))),
		_ => panic!("Expected Attach command"),
	}
	assert!(Cli::try_parse_from(["rterm", "attach", "1", "--size", "24"]).is_err());
}

#[test]
fn parse_aliases() {
	assert!(matches!(Cli::try_parse_from(["rterm", "ls"]).unwrap().command, Commands::List));
	assert!(matches!(
		Cli::try_parse_from(["rterm", "kill", "1"]).unwrap().command,
		Commands::Shutdown(_)
	));
	assert!(matches!(
		Cli::try_parse_from(["rterm", "shutdown-all"]).unwrap().command,
		Commands::ShutdownAll
	));
}

#[test]
fn size_parser_rejects_garbage() {
	assert_eq!(parse_size("40X120"), Ok((40, 120)));
	assert!(parse_size("axb").is_err());
	assert!(parse_size("").is_err());
}
