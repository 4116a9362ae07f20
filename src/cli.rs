// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("ledgerclip")
        .about("Double-entry personal finance ledger")
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .default_value("personal")
                                .help("personal or foreign"),
                        )
                        .arg(Arg::new("iban").long("iban"))
                        .arg(
                            Arg::new("dashboard")
                                .long("dashboard")
                                .action(ArgAction::SetTrue)
                                .help("Show on the dashboard"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(Arg::new("type").long("type")),
                ))
                .subcommand(
                    Command::new("rm")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("type").long("type").default_value("personal")),
                )
                .subcommand(
                    Command::new("merge")
                        .about("Merge foreign accounts into one")
                        .arg(Arg::new("into").long("into").required(true))
                        .arg(
                            Arg::new("targets")
                                .num_args(1..)
                                .required(true)
                                .help("Names of the foreign accounts to fold in"),
                        ),
                )
                .subcommand(
                    Command::new("set-balance")
                        .about("Record an initial balance")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(Command::new("add").arg(Arg::new("name").long("name").required(true)))
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and inspect transactions")
                .subcommand(
                    Command::new("transfer")
                        .arg(Arg::new("src").long("src").required(true))
                        .arg(Arg::new("dst").long("dst").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("withdraw")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("payee").long("payee").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("deposit")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("payer").long("payer").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("split")
                        .about("Record an n-way split transaction")
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("src").long("src").required(true))
                        .arg(Arg::new("dst").long("dst").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("line")
                                .long("line")
                                .action(ArgAction::Append)
                                .required(true)
                                .help("account:opposing:amount[:category], repeatable"),
                        ),
                )
                .subcommand(
                    Command::new("reconcile")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("balance").long("balance").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(
                            Arg::new("title")
                                .long("title")
                                .default_value("Reconciliation"),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("title").long("title"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("month").long("month"))
                        .arg(Arg::new("account").long("account"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Monthly budgets per category")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(Command::new("list").arg(Arg::new("month").long("month")))
                .subcommand(json_flags(
                    Command::new("report").arg(Arg::new("month").long("month").required(true)),
                )),
        )
        .subcommand(
            Command::new("recurrence")
                .about("Recurring transactions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("src").long("src").required(true))
                        .arg(Arg::new("src-type").long("src-type").default_value("personal"))
                        .arg(Arg::new("dst").long("dst").required(true))
                        .arg(Arg::new("dst-type").long("dst-type").default_value("foreign"))
                        .arg(
                            Arg::new("interval")
                                .long("interval")
                                .default_value("monthly")
                                .help("disabled, daily, weekly, monthly, quarterly, biannually, annually"),
                        )
                        .arg(
                            Arg::new("multiplier")
                                .long("multiplier")
                                .default_value("1")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(
                            Arg::new("weekend")
                                .long("weekend")
                                .default_value("same_day")
                                .help("same_day, previous_weekday, next_weekday, skip"),
                        )
                        .arg(
                            Arg::new("month-day")
                                .long("month-day")
                                .default_value("0")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(Arg::new("category").long("category")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("skip").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    Command::new("generate")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import bank statements")
                .subcommand(
                    Command::new("statements")
                        .arg(Arg::new("path").long("path").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(
                            Arg::new("dry-run")
                                .long("dry-run")
                                .action(ArgAction::SetTrue)
                                .help("Stage and report without posting"),
                        ),
                )
                .subcommand(
                    Command::new("firefly").arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export").about("Export splits as CSV").subcommand(
                Command::new("transactions")
                    .arg(Arg::new("start").long("start").required(true))
                    .arg(Arg::new("end").long("end").required(true))
                    .arg(Arg::new("out").long("out").required(true))
                    .arg(
                        Arg::new("account")
                            .long("account")
                            .action(ArgAction::Append)
                            .help("Restrict to these accounts, repeatable"),
                    ),
            ),
        )
        .subcommand(
            Command::new("report")
                .about("Balances and aggregates")
                .subcommand(
                    Command::new("balance")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(json_flags(
                    Command::new("series")
                        .arg(
                            Arg::new("account")
                                .long("account")
                                .help("Single account; omit for the dashboard accounts combined"),
                        )
                        .arg(Arg::new("start").long("start").required(true))
                        .arg(Arg::new("end").long("end").required(true))
                        .arg(
                            Arg::new("steps")
                                .long("steps")
                                .default_value("50")
                                .value_parser(value_parser!(u32)),
                        ),
                ))
                .subcommand(json_flags(Command::new("dashboard")))
                .subcommand(json_flags(
                    Command::new("spend-by-category")
                        .arg(Arg::new("month").long("month").required(true)),
                ))
                .subcommand(json_flags(
                    Command::new("category-history")
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("month").long("month").required(true)),
                )),
        )
        .subcommand(Command::new("doctor").about("Check ledger invariants"))
}
