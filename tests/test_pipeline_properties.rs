//! Pipeline ordering, invalidation and concurrency properties, exercised
//! through the public API with a scripted model backend.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;

use poegen::{
    Orchestrator, PipelineState, PoeError, PovWindow, ResourceEstimate, Session, SessionInputs,
    StageId, TemplateSet,
};
use poegen_llm::ScriptedBackend;
use poegen_render::tabular::{default_header, parse_estimates};

const SOLUTION: &str = "# 宇宙无敌科技 - 智能客服平台方案\n\n## 一、项目背景\n\n跨境电商客服。\n\n| 组件 | 说明 |\n| --- | --- |\n| Azure OpenAI | 对话生成 |\n";
const POV: &str = "# 宇宙无敌科技 - POV 部署计划\n\n## 一、执行周期\n\n- 第一周：环境准备\n- 第二周：验证\n";
const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 50"><rect width="100" height="50" fill="#fff"/><text x="10" y="25">App</text></svg>"##;
const ESTIMATES: &str = "Resource type,SKU,Monthly cost\nVirtual machine,D4s_v5,140.16\nSQL database,GP_Gen5_2,370.00\nStorage,Standard_LRS,20.48\n";
const MAPPING: &str = r#"以下为映射结果：
[
  {"row": 1, "record": {"*Server name": "app-01", "Cores": 4, "*Memory (In MB)": 16384}},
  {"row": 2, "record": {"*Server name": "db-01", "Cores": 2}},
  {"row": 3, "record": null}
]"#;

fn inputs() -> SessionInputs {
    SessionInputs {
        customer_name: "宇宙无敌科技".to_string(),
        budget: "50k+".to_string(),
        background: "跨境电商，计划引入智能客服与多语种商品描述生成。".to_string(),
        pov: PovWindow::two_weeks_from(NaiveDate::from_ymd_opt(2026, 2, 26).unwrap()),
        team_roster: "技术负责人: 张三 (乙方)\n业务负责人: 李四 (甲方)".to_string(),
    }
}

fn estimates() -> Vec<ResourceEstimate> {
    parse_estimates(ESTIMATES.as_bytes()).unwrap()
}

fn orchestrator(backend: &Arc<ScriptedBackend>) -> Orchestrator {
    Orchestrator::new(
        Arc::clone(backend) as Arc<dyn poegen::LlmBackend>,
        Arc::new(TemplateSet::empty()),
        Duration::from_secs(5),
    )
}

async fn run_through(orchestrator: &Orchestrator, session: &Session, through: StageId) {
    for stage in StageId::ALL.into_iter().take_while(|s| *s <= through) {
        orchestrator.generate(session, stage).await.unwrap();
    }
}

#[tokio::test]
async fn test_every_later_stage_needs_its_prerequisite() {
    for stage in [StageId::PovPlan, StageId::Diagram, StageId::MigrationCsv] {
        let backend = Arc::new(ScriptedBackend::new(Vec::<String>::new()));
        let orchestrator = orchestrator(&backend);
        let session = Session::with_inputs(inputs());
        session.upload_estimates(estimates()).unwrap();

        let err = orchestrator.generate(&session, stage).await.unwrap_err();
        match err {
            PoeError::MissingPrerequisite {
                stage: failed,
                missing,
            } => {
                assert_eq!(failed, stage);
                assert_eq!(Some(missing), stage.prerequisite());
            }
            other => panic!("expected MissingPrerequisite for {stage}, got {other:?}"),
        }
        assert_eq!(backend.call_count(), 0, "no model call for {stage}");
    }
}

#[tokio::test]
async fn test_regenerate_invalidates_every_later_stage() {
    for k in [StageId::Solution, StageId::PovPlan, StageId::Diagram] {
        let backend = Arc::new(ScriptedBackend::new([SOLUTION, POV, SVG, MAPPING]));
        let orchestrator = orchestrator(&backend);
        let session = Session::with_inputs(inputs());
        session.upload_estimates(estimates()).unwrap();
        run_through(&orchestrator, &session, StageId::MigrationCsv).await;
        assert_eq!(session.pipeline_state(), PipelineState::Stage4Ready);

        let answer = match k {
            StageId::Solution => SOLUTION,
            StageId::PovPlan => POV,
            _ => SVG,
        };
        backend.push_response(answer);
        orchestrator.regenerate(&session, k).await.unwrap();

        assert!(session.result(k).is_some());
        for later in StageId::ALL.into_iter().filter(|s| *s > k) {
            assert!(session.result(later).is_none(), "{later} survived regenerate({k})");
        }
        assert_eq!(session.pipeline_state(), PipelineState::ready_through(Some(k)));
    }
}

#[tokio::test]
async fn test_regenerated_prerequisite_blocks_stale_downstream() {
    let backend = Arc::new(ScriptedBackend::new([SOLUTION, POV, SOLUTION]));
    let orchestrator = orchestrator(&backend);
    let session = Session::with_inputs(inputs());

    run_through(&orchestrator, &session, StageId::PovPlan).await;
    orchestrator.regenerate(&session, StageId::Solution).await.unwrap();

    let err = orchestrator.generate(&session, StageId::Diagram).await.unwrap_err();
    assert!(matches!(
        err,
        PoeError::MissingPrerequisite {
            missing: StageId::PovPlan,
            ..
        }
    ));
}

#[tokio::test]
async fn test_clear_all_then_generate_matches_fresh_session() {
    let backend = Arc::new(ScriptedBackend::new([SOLUTION, POV, SOLUTION]));
    let used_orchestrator = orchestrator(&backend);
    let used = Session::with_inputs(inputs());
    run_through(&used_orchestrator, &used, StageId::PovPlan).await;

    used_orchestrator.clear_all(&used).unwrap();
    assert_eq!(used.pipeline_state(), PipelineState::Empty);
    let after_clear = used_orchestrator.generate(&used, StageId::Solution).await.unwrap();

    let fresh_backend = Arc::new(ScriptedBackend::new([SOLUTION]));
    let fresh_orchestrator = orchestrator(&fresh_backend);
    let fresh = Session::with_inputs(inputs());
    let first = fresh_orchestrator
        .generate(&fresh, StageId::Solution)
        .await
        .unwrap();

    assert_eq!(after_clear.raw_text, first.raw_text);
    assert_eq!(after_clear.revision, first.revision);
    assert_eq!(after_clear.content_hash, first.content_hash);
    assert_eq!(after_clear.artifact.file_name, first.artifact.file_name);
    assert_eq!(after_clear.artifact.bytes, first.artifact.bytes);

    let cleared_prompt = &backend.invocations()[2].messages;
    let fresh_prompt = &fresh_backend.invocations()[0].messages;
    assert_eq!(cleared_prompt, fresh_prompt);
}

#[tokio::test]
async fn test_migration_csv_keeps_template_header_and_reports_drops() {
    let backend = Arc::new(ScriptedBackend::new([SOLUTION, POV, SVG, MAPPING]));
    let orchestrator = orchestrator(&backend);
    let session = Session::with_inputs(inputs());
    session.upload_estimates(estimates()).unwrap();
    run_through(&orchestrator, &session, StageId::MigrationCsv).await;

    let result = session.result(StageId::MigrationCsv).unwrap();
    let text = String::from_utf8(result.artifact.bytes.clone()).unwrap();
    let mut lines = text.lines();

    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let expected = default_header();
    assert_eq!(header, expected.iter().map(String::as_str).collect::<Vec<_>>());

    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.len() <= estimates().len());
    assert_eq!(result.dropped_rows(), 1);
    assert!(rows[0].starts_with("app-01,"));
}

#[tokio::test]
async fn test_artifact_file_name_convention() {
    let backend = Arc::new(ScriptedBackend::new([SOLUTION]));
    let orchestrator = orchestrator(&backend);
    let session = Session::with_inputs(inputs());

    let result = orchestrator.generate(&session, StageId::Solution).await.unwrap();
    let expected = format!(
        "{}-宇宙无敌科技-AI解决方案架构文档.docx",
        result.generated_at.with_timezone(&Local).format("%m%d")
    );
    assert_eq!(result.artifact.file_name, expected);

    assert_eq!(
        poegen_utils::naming::stage_file_name(
            NaiveDate::from_ymd_opt(2026, 2, 26).unwrap(),
            "宇宙无敌科技",
            StageId::Solution
        ),
        "0226-宇宙无敌科技-AI解决方案架构文档.docx"
    );
}

#[tokio::test]
async fn test_second_generate_fails_while_first_is_outstanding() {
    let backend = Arc::new(ScriptedBackend::gated([SOLUTION]));
    let orchestrator = Arc::new(orchestrator(&backend));
    let session = Arc::new(Session::with_inputs(inputs()));

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        let session = Arc::clone(&session);
        tokio::spawn(async move { orchestrator.generate(&session, StageId::Solution).await })
    };
    backend.wait_until_invoked().await;

    for stage in [StageId::Solution, StageId::PovPlan] {
        let err = orchestrator.generate(&session, stage).await.unwrap_err();
        assert!(matches!(
            err,
            PoeError::GenerationInProgress {
                in_flight: StageId::Solution
            }
        ));
    }
    assert!(matches!(
        orchestrator.regenerate(&session, StageId::Solution).await,
        Err(PoeError::GenerationInProgress { .. })
    ));
    assert!(session.set_background("改写").is_err());

    backend.release();
    let result = first.await.unwrap().unwrap();
    assert_eq!(result.raw_text, SOLUTION);
    assert_eq!(result.revision, 1);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(session.pipeline_state(), PipelineState::Stage1Ready);
}

#[tokio::test]
async fn test_sessions_do_not_block_each_other() {
    let backend = Arc::new(ScriptedBackend::gated([SOLUTION, SOLUTION]));
    let orchestrator = Arc::new(orchestrator(&backend));
    let a = Arc::new(Session::with_inputs(inputs()));
    let b = Arc::new(Session::with_inputs(inputs()));

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        let a = Arc::clone(&a);
        tokio::spawn(async move { orchestrator.generate(&a, StageId::Solution).await })
    };
    backend.wait_until_invoked().await;

    let second = {
        let orchestrator = Arc::clone(&orchestrator);
        let b = Arc::clone(&b);
        tokio::spawn(async move { orchestrator.generate(&b, StageId::Solution).await })
    };
    backend.wait_until_invoked().await;
    assert_eq!(b.in_flight(), Some(StageId::Solution));

    backend.release();
    backend.release();
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_missing_templates_render_default_documents() {
    let temp = tempfile::TempDir::new().unwrap();
    let templates = TemplateSet::load(
        &temp.path().join("solution_template.docx"),
        &temp.path().join("pov_template.docx"),
        &temp.path().join("migration_header.csv"),
    );
    assert!(templates.statuses().iter().all(|s| !s.loaded && s.problem.is_none()));

    let backend = Arc::new(ScriptedBackend::new([SOLUTION, POV]));
    let orchestrator = Orchestrator::new(
        Arc::clone(&backend) as Arc<dyn poegen::LlmBackend>,
        Arc::new(templates),
        Duration::from_secs(5),
    );
    let session = Session::with_inputs(inputs());

    for stage in [StageId::Solution, StageId::PovPlan] {
        let result = orchestrator.generate(&session, stage).await.unwrap();
        assert!(result.artifact.degraded);
        assert!(result.artifact.bytes.starts_with(b"PK"));
        assert!(!result.artifact.bytes.is_empty());
    }
}
