//! Shared fixtures: hand-lowered ASTs for the vulnerable handler patterns
//! the engine is meant to catch, plus rule-set helpers.

#![allow(dead_code)]

use taintflow::domain::ast::{Expr, FunctionDecl, Param, ProgramUnit, Property, Span, Stmt};
use taintflow::domain::rule::{Rule, RuleRole, RuleSet};

pub fn sp(line: u32, column: u32) -> Span {
    Span::new(line, column)
}

pub fn lit(value: &str, line: u32, column: u32) -> Expr {
    Expr::Literal {
        value: value.into(),
        span: sp(line, column),
    }
}

pub fn ident(name: &str, line: u32, column: u32) -> Expr {
    Expr::Identifier {
        name: name.into(),
        span: sp(line, column),
    }
}

pub fn member(object: Expr, property: &str, line: u32, column: u32) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.into(),
        span: sp(line, column),
    }
}

pub fn call(callee: Expr, args: Vec<Expr>, line: u32, column: u32) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
        span: sp(line, column),
    }
}

pub fn template(parts: Vec<Expr>, line: u32, column: u32) -> Expr {
    Expr::Template {
        parts,
        span: sp(line, column),
    }
}

pub fn object(properties: Vec<(&str, Expr)>, line: u32, column: u32) -> Expr {
    Expr::Object {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property {
                key: key.into(),
                value,
            })
            .collect(),
        span: sp(line, column),
    }
}

pub fn closure(params: &[(&str, u32, u32)], body: Vec<Stmt>, line: u32, column: u32) -> Expr {
    Expr::Closure {
        params: params
            .iter()
            .map(|(name, l, c)| Param {
                name: (*name).into(),
                span: sp(*l, *c),
            })
            .collect(),
        body,
        span: sp(line, column),
    }
}

pub fn let_(name: &str, value: Expr, line: u32, column: u32) -> Stmt {
    Stmt::Let {
        name: name.into(),
        value,
        span: sp(line, column),
    }
}

pub fn rule(id: &str, role: RuleRole, category: &str, matcher: &str) -> Rule {
    Rule {
        id: id.into(),
        role,
        category: category.into(),
        matcher: matcher.into(),
        description: None,
    }
}

/// Rules matching the command-injection handler: request query source,
/// shell execution sink.
pub fn command_rules() -> RuleSet {
    RuleSet::new(vec![
        rule("req-query", RuleRole::Source, "command-injection", "req.query.*"),
        rule("exec", RuleRole::Sink, "command-injection", "exec(...)"),
    ])
}

/// Rules matching the two-module NoSQL handler: request sources, query
/// execution sink, numeric-conversion sanitizer.
pub fn nosql_rules() -> RuleSet {
    RuleSet::new(vec![
        rule("req-params", RuleRole::Source, "nosql-injection", "req.params.*"),
        rule("req-query", RuleRole::Source, "nosql-injection", "req.query.*"),
        rule("collection-find", RuleRole::Sink, "nosql-injection", "*.find(...)"),
        rule("parse-int", RuleRole::Sanitizer, "nosql-injection", "parseInt(...)"),
    ])
}

/// An Express-style route whose query parameter is interpolated into a
/// shell command:
///
/// ```text
/// app.get('/', (req, res) => {
///   const folder = req.query.folder;
///   if (folder) {
///     exec(`ls -l ${folder}`, (error, stdout, stderr) => {
///       let output = stdout;
///       if (error) { output = error; }
///       res.send(pug.renderFile('./pages/index.pug', { output, folder }));
///     });
///   } else {
///     res.send(pug.renderFile('./pages/index.pug', {}));
///   }
/// });
/// ```
pub fn command_injection_unit() -> ProgramUnit {
    let callback_body = vec![
        let_("output", ident("stdout", 5, 19), 5, 6),
        Stmt::If {
            condition: ident("error", 6, 10),
            then_body: vec![Stmt::Assign {
                target: ident("output", 7, 8),
                value: ident("error", 7, 17),
                span: sp(7, 8),
            }],
            else_body: vec![],
            span: sp(6, 6),
        },
        Stmt::Expr {
            expr: call(
                member(ident("res", 9, 6), "send", 9, 10),
                vec![call(
                    member(ident("pug", 10, 8), "renderFile", 10, 12),
                    vec![
                        lit("./pages/index.pug", 10, 27),
                        object(
                            vec![
                                ("output", ident("output", 10, 56)),
                                ("folder", ident("folder", 10, 72)),
                            ],
                            10,
                            47,
                        ),
                    ],
                    10,
                    8,
                )],
                9,
                6,
            ),
        },
    ];

    let handler_body = vec![
        let_(
            "folder",
            member(
                member(ident("req", 2, 17), "query", 2, 21),
                "folder",
                2,
                27,
            ),
            2,
            8,
        ),
        Stmt::If {
            condition: ident("folder", 3, 6),
            then_body: vec![Stmt::Expr {
                expr: call(
                    ident("exec", 4, 4),
                    vec![
                        template(vec![lit("ls -l ", 4, 10), ident("folder", 4, 19)], 4, 9),
                        closure(
                            &[("error", 4, 29), ("stdout", 4, 36), ("stderr", 4, 44)],
                            callback_body,
                            4,
                            28,
                        ),
                    ],
                    4,
                    4,
                ),
            }],
            else_body: vec![Stmt::Expr {
                expr: call(
                    member(ident("res", 13, 4), "send", 13, 8),
                    vec![call(
                        member(ident("pug", 13, 13), "renderFile", 13, 17),
                        vec![lit("./pages/index.pug", 13, 32), object(vec![], 13, 53)],
                        13,
                        13,
                    )],
                    13,
                    4,
                ),
            }],
            span: sp(3, 2),
        },
    ];

    ProgramUnit {
        file: "command.js".into(),
        body: vec![Stmt::Expr {
            expr: call(
                member(ident("app", 1, 0), "get", 1, 4),
                vec![
                    lit("/", 1, 8),
                    closure(&[("req", 1, 13), ("res", 1, 18)], handler_body, 1, 12),
                ],
                1,
                0,
            ),
        }],
    }
}

/// The DAO half of the two-module NoSQL handler: a collection handle, a
/// sanitized userId, and a `$where` query document interpolating both
/// parameters.
pub fn nosql_dao_unit() -> ProgramUnit {
    let search_criteria = closure(
        &[],
        vec![Stmt::Return {
            value: Some(object(
                vec![(
                    "$where",
                    template(
                        vec![
                            lit("this.userId == ", 8, 24),
                            ident("parsedUserId", 8, 41),
                            lit(" && this.stocks > '", 8, 55),
                            ident("threshold", 8, 77),
                            lit("'", 8, 88),
                        ],
                        8,
                        23,
                    ),
                )],
                7,
                19,
            )),
            span: sp(7, 12),
        }],
        6,
        31,
    );

    let method_body = vec![
        let_(
            "parsedUserId",
            call(ident("parseInt", 5, 29), vec![ident("userId", 5, 38)], 5, 29),
            5,
            8,
        ),
        let_("searchCriteria", search_criteria, 6, 8),
        Stmt::Expr {
            expr: call(
                member(ident("allocationsCol", 12, 8), "find", 12, 23),
                vec![call(ident("searchCriteria", 12, 28), vec![], 12, 28)],
                12,
                8,
            ),
        },
    ];

    let dao_body = vec![
        let_(
            "allocationsCol",
            call(
                member(ident("db", 2, 27), "collection", 2, 30),
                vec![lit("allocations", 2, 41)],
                2,
                27,
            ),
            2,
            10,
        ),
        Stmt::Assign {
            target: member(ident("this", 4, 4), "getByUserIdAndThreshold", 4, 9),
            value: closure(
                &[("userId", 4, 36), ("threshold", 4, 44), ("callback", 4, 55)],
                method_body,
                4,
                35,
            ),
            span: sp(4, 4),
        },
    ];

    ProgramUnit {
        file: "allocations-dao.js".into(),
        body: vec![let_(
            "AllocationsDAO",
            closure(&[("db", 1, 32)], dao_body, 1, 23),
            1,
            6,
        )],
    }
}

/// The handler half: request parameters pulled off `req` and handed to the
/// DAO method with a logging callback.
pub fn nosql_handler_unit() -> ProgramUnit {
    let display_body = vec![
        let_(
            "userId",
            member(
                member(ident("req", 5, 12), "params", 5, 16),
                "userId",
                5,
                23,
            ),
            5,
            8,
        ),
        let_(
            "threshold",
            member(
                member(ident("req", 8, 12), "query", 8, 16),
                "threshold",
                8,
                22,
            ),
            8,
            8,
        ),
        Stmt::Expr {
            expr: call(
                member(
                    ident("allocationsDAO", 10, 8),
                    "getByUserIdAndThreshold",
                    10,
                    23,
                ),
                vec![
                    ident("userId", 10, 47),
                    ident("threshold", 10, 55),
                    closure(
                        &[],
                        vec![Stmt::Expr {
                            expr: call(
                                member(ident("console", 11, 12), "log", 11, 20),
                                vec![lit("test", 11, 24)],
                                11,
                                12,
                            ),
                        }],
                        10,
                        66,
                    ),
                ],
                10,
                8,
            ),
        },
    ];

    ProgramUnit {
        file: "allocations-handler.js".into(),
        body: vec![Stmt::Function(FunctionDecl {
            name: "AllocationsHandler".into(),
            params: vec![Param {
                name: "db".into(),
                span: sp(1, 28),
            }],
            body: vec![
                let_(
                    "allocationsDAO",
                    call(
                        ident("AllocationsDAO", 2, 27),
                        vec![ident("db", 2, 42)],
                        2,
                        27,
                    ),
                    2,
                    10,
                ),
                Stmt::Assign {
                    target: member(ident("this", 4, 4), "displayAllocations", 4, 9),
                    value: closure(
                        &[("req", 4, 31), ("res", 4, 36), ("next", 4, 41)],
                        display_body,
                        4,
                        30,
                    ),
                    span: sp(4, 4),
                },
            ],
            span: sp(1, 0),
        })],
    }
}
