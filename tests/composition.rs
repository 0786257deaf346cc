// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 cdflow contributors

//! End-to-end declarations through the public DSL

use std::cell::Cell;
use std::rc::Rc;

use cdflow::pipeline::Material;
use cdflow::{
    BuildOptions, CdflowError, Configuration, ContextScope, Enhancer, LockBehavior, NodeId,
    PathFinder, PipelineGraph,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdflow=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn sorted_edges(graph: &PipelineGraph) -> Vec<(String, String)> {
    let mut edges = graph.edge_names();
    edges.sort();
    edges
}

fn edge(from: &str, to: &str) -> (String, String) {
    (from.to_string(), to.to_string())
}

#[test]
fn build_fans_out_to_tests_and_back_in_to_deploy() {
    init_tracing();

    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("build", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel(|par| {
                par.pipeline("test1", |p| {
                    p.stage("s", false, |_| {});
                });
                par.pipeline("test2", |p| {
                    p.stage("s", false, |_| {});
                });
            });
            seq.pipeline("deploy", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    assert_eq!(
        sorted_edges(config.graph()),
        vec![
            edge("build", "test1"),
            edge("build", "test2"),
            edge("test1", "deploy"),
            edge("test2", "deploy"),
        ]
    );
    assert_eq!(config.groups().len(), 1);
}

#[test]
fn nested_sequences_inside_parallel_keep_their_own_order() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("checkout", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel(|par| {
                par.sequence(|inner| {
                    inner.pipeline("lint", |p| {
                        p.stage("s", false, |_| {});
                    });
                    inner.pipeline("unit", |p| {
                        p.stage("s", false, |_| {});
                    });
                });
                par.pipeline("docs", |p| {
                    p.stage("s", false, |_| {});
                });
            });
            seq.pipeline("publish", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    assert_eq!(
        sorted_edges(config.graph()),
        vec![
            edge("checkout", "docs"),
            edge("checkout", "lint"),
            edge("docs", "publish"),
            edge("lint", "unit"),
            edge("unit", "publish"),
        ]
    );
}

#[test]
fn parallel_after_forks_from_an_earlier_pipeline() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            let package = seq.pipeline("package", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("smoke", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel_after(package, |par| {
                par.pipeline("eu", |p| {
                    p.stage("s", false, |_| {});
                });
                par.pipeline("us", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap();

    assert_eq!(
        sorted_edges(config.graph()),
        vec![
            edge("package", "eu"),
            edge("package", "smoke"),
            edge("package", "us"),
            edge("smoke", "eu"),
            edge("smoke", "us"),
        ]
    );
}

#[test]
fn separate_groups_are_not_connected() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("a", |p| {
                p.stage("s", false, |_| {});
            });
        });
        root.parallel(|par| {
            par.pipeline("b", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    assert_eq!(config.graph().len(), 2);
    assert_eq!(config.graph().edge_count(), 0);
    assert_eq!(config.groups().len(), 2);
}

#[test]
fn innermost_group_wins() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.group("team-b", |outer| {
                outer.group("team-a", |inner| {
                    inner.pipeline("x", |p| {
                        p.stage("s", false, |_| {});
                    });
                });
            });
        });
    })
    .unwrap();

    assert_eq!(config.pipeline("x").unwrap().group.as_deref(), Some("team-a"));
}

#[test]
fn explicit_group_beats_group_scope() {
    let config = Configuration::build(|root| {
        root.parallel(|par| {
            par.group("platform", |par| {
                par.pipeline("x", |p| {
                    p.stage("s", false, |_| {});
                    p.group("security");
                });
            });
        });
    })
    .unwrap();

    assert_eq!(config.pipeline("x").unwrap().group.as_deref(), Some("security"));
}

#[test]
fn contexts_reach_the_whole_group_by_default() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("before", |p| {
                p.stage("s", false, |_| {});
            });
            seq.group("release", |seq| {
                seq.pipeline("inside", |p| {
                    p.stage("s", false, |_| {});
                });
            });
            seq.pipeline("after", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    let group = |name: &str| config.pipeline(name).unwrap().group.clone();
    assert_eq!(group("before").as_deref(), Some("release"));
    assert_eq!(group("inside").as_deref(), Some("release"));
    // Declared after the context closed
    assert_eq!(group("after"), None);
}

#[test]
fn body_scope_limits_contexts_to_their_own_declarations() {
    let options = BuildOptions {
        context_scope: ContextScope::Body,
        ..BuildOptions::default()
    };

    let config = Configuration::build_with(options, |root| {
        root.sequence(|seq| {
            seq.group("one", |seq| {
                seq.pipeline("a", |p| {
                    p.stage("s", false, |_| {});
                });
            });
            seq.group("two", |seq| {
                seq.pipeline("b", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap();

    assert_eq!(config.pipeline("a").unwrap().group.as_deref(), Some("one"));
    assert_eq!(config.pipeline("b").unwrap().group.as_deref(), Some("two"));
}

#[test]
fn generic_context_applies_enhancers_in_order() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.context(
                |ctx| {
                    ctx.set_data("region", "eu-west-1");
                    ctx.enhance(Enhancer::SetTag("stage".into(), "draft".into()));
                },
                |seq| {
                    seq.pipeline("deploy", |p| {
                        p.stage("s", false, |_| {});
                    });
                    seq.enhance(Enhancer::SetTag("stage".into(), "final".into()));
                    seq.enhance(Enhancer::mutate(|node, data| {
                        if let Some(region) = data.get("region") {
                            node.parameters.insert("REGION".into(), region.clone());
                        }
                    }));
                    seq.enhance(Enhancer::SetLockBehavior(LockBehavior::LockOnFailure));
                },
            );
        });
    })
    .unwrap();

    let deploy = config.pipeline("deploy").unwrap();
    assert_eq!(deploy.tags["stage"], "final");
    assert_eq!(deploy.parameters["REGION"], "eu-west-1");
    assert_eq!(deploy.lock_behavior, LockBehavior::LockOnFailure);
}

#[test]
fn group_level_enhancers_apply_when_the_group_closes() {
    let config = Configuration::build(|root| {
        root.parallel(|par| {
            par.enhance(Enhancer::SetEnvironmentVariable("CI".into(), "true".into()));
            par.pipeline("a", |p| {
                p.stage("s", false, |_| {});
            });
            par.pipeline("b", |p| {
                p.stage("s", false, |_| {});
                p.env("RETRIES", 3);
            });
        });
    })
    .unwrap();

    for name in ["a", "b"] {
        assert_eq!(config.pipeline(name).unwrap().environment_variables["CI"], "true");
    }
    assert_eq!(config.pipeline("b").unwrap().environment_variables["RETRIES"], "3");
}

#[test]
fn pipeline_attributes_are_recorded() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("build", |p| {
                p.materials(|m| {
                    m.git_branch("https://example.com/app.git", "main");
                });
                p.stage("compile", false, |s| {
                    s.env("RUSTFLAGS", "-D warnings");
                    s.job("cargo", |j| {
                        j.exec("cargo", &["build", "--release"]);
                        j.resource("linux");
                    });
                });
                p.stage("approve", true, |_| {});
                p.tag("team", "core");
                p.parameter("TARGET", "x86_64");
                p.lock_behavior(LockBehavior::None);
            });
        });
    })
    .unwrap();

    let build = config.pipeline("build").unwrap();
    assert_eq!(build.stage_names(), vec!["compile", "approve"]);
    assert_eq!(build.last_stage_name().unwrap(), "approve");
    assert!(build.get_stage("approve").unwrap().manual_approval);

    let compile = build.get_stage("compile").unwrap();
    assert_eq!(compile.body.jobs[0].tasks[0].arguments, vec!["build", "--release"]);
    assert_eq!(compile.body.jobs[0].resources, vec!["linux"]);
    assert_eq!(compile.body.environment_variables["RUSTFLAGS"], "-D warnings");

    assert_eq!(build.tags["team"], "core");
    assert_eq!(build.parameters["TARGET"], "x86_64");
    assert_eq!(build.lock_behavior, LockBehavior::None);
    assert_eq!(
        build.materials.as_ref().unwrap().entries,
        vec![Material::Git {
            url: "https://example.com/app.git".into(),
            branch: Some("main".into()),
        }]
    );
}

#[test]
fn pipeline_without_stages_or_template_is_rejected() {
    let err = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("build", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("empty", |_| {});
        });
    })
    .unwrap_err();

    match err {
        CdflowError::StructuralValidation {
            pipeline,
            declared_at,
        } => {
            assert_eq!(pipeline, "empty");
            assert!(declared_at.contains("composition.rs"), "{declared_at}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn template_only_pipeline_is_accepted() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("deploy", |p| {
                p.template("deploy-template", "rollout");
            });
        });
    })
    .unwrap();

    assert_eq!(config.pipeline("deploy").unwrap().last_stage_name().unwrap(), "rollout");
}

#[test]
fn duplicate_names_are_rejected() {
    let err = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("same", |p| {
                p.stage("s", false, |_| {});
            });
        });
        root.sequence(|seq| {
            seq.pipeline("same", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap_err();

    assert!(matches!(err, CdflowError::DuplicatePipeline { ref pipeline } if pipeline == "same"));
}

#[test]
fn empty_sequence_between_steps_is_a_precondition_error() {
    let err = Configuration::build(|root| {
        root.parallel(|par| {
            par.sequence(|_| {});
        });
        root.sequence(|seq| {
            seq.pipeline("a", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel(|par| {
                par.sequence(|_| {});
            });
        });
    })
    .unwrap_err();

    assert!(err.is_precondition());
}

#[test]
fn declaration_trace_points_at_user_code() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.parallel(|par| {
                par.pipeline("x", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap();

    let frames = config.pipeline("x").unwrap().declared_at().frames();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.file.ends_with("composition.rs")));
    assert!(frames[0].line < frames[1].line && frames[1].line < frames[2].line);
}

#[test]
fn path_query_over_the_finished_graph() {
    let mut deploy = None;
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("A", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("B", |p| {
                p.stage("s", false, |_| {});
            });
            deploy = Some(seq.pipeline("C", |p| {
                p.stage("s", false, |_| {});
            }));
        });
    })
    .unwrap();
    let target = deploy.unwrap();

    assert_eq!(config.path_to_pipeline(target, |n| n.name == "A").unwrap(), "A/B");

    let err = config.path_to_pipeline(target, |n| n.name == "nope").unwrap_err();
    match err {
        CdflowError::PathNotFound {
            target: name,
            id,
            declared_at,
        } => {
            assert_eq!(name, "C");
            assert_eq!(id, target);
            assert!(declared_at.contains("composition.rs"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn configured_separator_is_used() {
    let options = BuildOptions::from_toml("path_separator = \"::\"").unwrap();
    let mut target: Option<NodeId> = None;
    let config = Configuration::build_with(options, |root| {
        root.sequence(|seq| {
            seq.pipeline("A", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("B", |p| {
                p.stage("s", false, |_| {});
            });
            target = Some(seq.pipeline("C", |p| {
                p.stage("s", false, |_| {});
            }));
        });
    })
    .unwrap();

    let target = target.unwrap();
    assert_eq!(config.path_to_pipeline(target, |n| n.name == "A").unwrap(), "A::B");
}

#[test]
fn graph_processors_see_predecessors() {
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);

    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("build", |p| {
                p.stage("package", false, |_| {});
            });
            seq.parallel(|par| {
                par.pipeline("test", |p| {
                    p.stage("verify", false, |_| {});
                });
                par.pipeline("lint", |p| {
                    p.stage("check", false, |_| {});
                });
            });
            seq.pipeline("deploy", |p| {
                p.stage("rollout", false, |_| {});
                p.on_graph(move |id, graph| {
                    counter.set(counter.get() + 1);
                    let mut materials = Vec::new();
                    for upstream in graph.predecessors(id)? {
                        if let Some(node) = graph.node(upstream) {
                            materials.push(Material::Dependency {
                                pipeline: node.name.clone(),
                                stage: node.last_stage_name()?.to_string(),
                            });
                        }
                    }
                    if let Some(node) = graph.node_mut(id) {
                        node.materials.get_or_insert_with(Default::default).entries = materials;
                    }
                    Ok(())
                });
            });
        });
    })
    .unwrap();

    assert_eq!(runs.get(), 1);
    let deploy = config.pipeline("deploy").unwrap();
    assert_eq!(
        deploy.materials.as_ref().unwrap().entries,
        vec![
            Material::Dependency {
                pipeline: "test".into(),
                stage: "verify".into(),
            },
            Material::Dependency {
                pipeline: "lint".into(),
                stage: "check".into(),
            },
        ]
    );
}

#[test]
fn graph_processor_errors_abort_the_build() {
    let err = Configuration::build(|root| {
        root.sequence(|seq| {
            let lonely = seq.pipeline("lonely", |p| {
                p.stage("s", false, |_| {});
            });
            seq.graph_processor(lonely, |id, graph| {
                PathFinder::path_to_pipeline(graph, id, |n| n.name == "upstream").map(|_| ())
            });
        });
    })
    .unwrap_err();

    assert!(matches!(err, CdflowError::PathNotFound { .. }));
}

#[test]
fn finished_configuration_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Configuration>();
    assert_send_sync::<PipelineGraph>();

    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("A", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("B", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    let target = config.pipeline("B").unwrap().id();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(config.path_to_pipeline(target, |n| n.name == "A").unwrap(), "A");
            });
        }
    });
}

#[test]
fn export_lists_groups_pipelines_and_edges() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            let build = seq.pipeline("build", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel_after(build, |par| {
                par.pipeline("test", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap();

    let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
    assert_eq!(json["groups"][0]["type"], "sequence");
    assert_eq!(json["groups"][0]["children"][1]["type"], "parallel");
    assert_eq!(json["groups"][0]["children"][1]["fork"], "build");
    assert_eq!(json["pipelines"][1]["name"], "test");
    assert_eq!(json["pipelines"][0]["lock_behavior"], "unlockWhenFinished");
    assert_eq!(json["edges"][0]["from"], "build");
    assert_eq!(json["edges"][0]["to"], "test");

    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("name: build"));
}

#[test]
fn matching_target_has_an_empty_path() {
    let config = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("A", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("B", |p| {
                p.stage("s", false, |_| {});
            });
        });
    })
    .unwrap();

    let target = config.pipeline("B").unwrap().id();
    assert_eq!(config.path_to_pipeline(target, |n| n.name == "B").unwrap(), "");
    assert_eq!(config.path_to_pipeline(target, |_| true).unwrap(), "");
}

#[test]
fn bare_pipeline_is_reported_even_after_a_duplicate() {
    let err = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("a", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("a", |p| {
                p.stage("s", false, |_| {});
            });
            seq.pipeline("bare", |_| {});
        });
    })
    .unwrap_err();

    assert!(matches!(
        err,
        CdflowError::StructuralValidation { ref pipeline, .. } if pipeline == "bare"
    ));
}

#[test]
fn fork_from_another_group_is_rejected() {
    let err = Configuration::build(|root| {
        let mut upstream = None;
        root.sequence(|seq| {
            upstream = Some(seq.pipeline("upstream", |p| {
                p.stage("s", false, |_| {});
            }));
        });
        let Some(upstream) = upstream else {
            return;
        };
        root.sequence(|seq| {
            seq.pipeline("first", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel_after(upstream, |par| {
                par.pipeline("x", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap_err();

    assert!(err.is_precondition());
    assert!(matches!(err, CdflowError::ForeignFork { .. }));
}

#[test]
fn fork_from_another_build_is_rejected() {
    let other = Configuration::build(|root| {
        root.sequence(|seq| {
            for name in ["p0", "p1", "p2", "p3"] {
                seq.pipeline(name, |p| {
                    p.stage("s", false, |_| {});
                });
            }
        });
    })
    .unwrap();
    let foreign = other.pipeline("p3").unwrap().id();

    let err = Configuration::build(|root| {
        root.sequence(|seq| {
            seq.pipeline("only", |p| {
                p.stage("s", false, |_| {});
            });
            seq.parallel_after(foreign, |par| {
                par.pipeline("x", |p| {
                    p.stage("s", false, |_| {});
                });
            });
        });
    })
    .unwrap_err();

    assert!(matches!(err, CdflowError::ForeignFork { fork } if fork == foreign));
}
