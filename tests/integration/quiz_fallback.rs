//! Quiz-only generation: count enforcement and template backfill

use serde_json::json;
use studygen::content::lesson::{self, GenerateRequest, GeneratedContent};
use studygen::content::options::{meaningful_options, OPTION_COUNT};

use crate::integration::test_utils::{fixture_service, object};

fn quiz_request() -> GenerateRequest {
    GenerateRequest::new("python", "파이썬 딕셔너리").quiz_only(3)
}

#[test]
fn empty_raw_quiz_is_insufficient() {
    let request = quiz_request();
    let raw = object(json!({
        "title": "파이썬 딕셔너리 문제 세트",
        "content": "파이썬 딕셔너리의 키와 값 사용법을 점검합니다.",
        "code_examples": [],
        "quiz": []
    }));
    let as_returned = GeneratedContent::from_raw(&raw).unwrap();
    let issues = lesson::quality_issues(&as_returned, &request);
    assert!(issues.contains("quiz_count_insufficient"));
}

#[test]
fn normalization_backfills_exactly_three_items() {
    let request = quiz_request();
    let raw = object(json!({"title": "파이썬 딕셔너리 문제 세트", "quiz": []}));
    let content = lesson::normalize(&raw, &request);

    assert_eq!(content.quiz.len(), 3);
    assert!(content.code_examples.is_empty());
    for item in &content.quiz {
        assert_eq!(item.options.len(), OPTION_COUNT);
        assert_eq!(meaningful_options(&item.options).len(), OPTION_COUNT);
        assert!((0..OPTION_COUNT as i64).contains(&item.correct_answer));
        assert!(item.question.contains("파이썬 딕셔너리"));
    }
    assert!(!lesson::quality_issues(&content, &request).contains("quiz_count_insufficient"));
}

#[test]
fn partial_quiz_is_padded_from_template() {
    let request = quiz_request();
    let raw = object(json!({
        "quiz": [{
            "question": "파이썬 딕셔너리에서 존재하지 않는 키를 안전하게 조회하는 방법은?",
            "options": ["A) get 메서드", "B) 인덱스 접근", "C) pop 호출", "D) 보기 4"],
            "correct_answer": 0,
            "explanation": "get 메서드는 키가 없으면 기본값을 돌려주므로 KeyError가 발생하지 않습니다."
        }]
    }));
    let content = lesson::normalize(&raw, &request);

    assert_eq!(content.quiz.len(), 3);
    let first = &content.quiz[0];
    assert_eq!(first.options[..3], ["get 메서드", "인덱스 접근", "pop 호출"]);
    assert_eq!(first.options.len(), OPTION_COUNT);
    assert_eq!(content.quiz[1], lesson::template_quiz("파이썬 딕셔너리", 3)[1]);
}

#[tokio::test]
async fn quiz_only_request_served_end_to_end() {
    let request = quiz_request();
    let (service, provider) = fixture_service(vec![json!({
        "title": "파이썬 딕셔너리 문제 훈련",
        "content": "파이썬 딕셔너리의 조회와 갱신을 점검하는 문제 세트입니다.",
        "quiz": []
    })]);
    let content = service.generate_content(&request).await.unwrap();
    assert_eq!(content.quiz.len(), 3);
    assert_eq!(provider.calls(), 1);
}
