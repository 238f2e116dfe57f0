//! Localized notification templates.

use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::locale::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationAccepted,
    ApplicationRejected,
    ApplicationWithdrawn,
    RemovedFromTask,
    TaskCancelled,
    CompletionRequested,
    TaskCompleted,
    TaskDisputed,
    ReviewReceived,
    QuestionAsked,
    QuestionAnswered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationAccepted => "application_accepted",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::ApplicationWithdrawn => "application_withdrawn",
            NotificationKind::RemovedFromTask => "removed_from_task",
            NotificationKind::TaskCancelled => "task_cancelled",
            NotificationKind::CompletionRequested => "completion_requested",
            NotificationKind::TaskCompleted => "task_completed",
            NotificationKind::TaskDisputed => "task_disputed",
            NotificationKind::ReviewReceived => "review_received",
            NotificationKind::QuestionAsked => "question_asked",
            NotificationKind::QuestionAnswered => "question_answered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

fn source(locale: Locale, kind: NotificationKind) -> (&'static str, &'static str) {
    use Locale::*;
    use NotificationKind::*;

    match (kind, locale) {
        (ApplicationReceived, En) => ("New application", "{{ actor_name }} applied to \"{{ task_title }}\" offering {{ price }} BGN."),
        (ApplicationReceived, Bg) => ("Нова кандидатура", "{{ actor_name }} кандидатства за „{{ task_title }}“ с предложение {{ price }} лв."),
        (ApplicationReceived, Ru) => ("Новый отклик", "{{ actor_name }} откликнулся на «{{ task_title }}» с ценой {{ price }} лв."),
        (ApplicationReceived, Uk) => ("Нова заявка", "{{ actor_name }} подав заявку на «{{ task_title }}» з ціною {{ price }} лв."),

        (ApplicationAccepted, En) => ("Your application was accepted", "You have been selected for \"{{ task_title }}\". Get in touch with the customer to start."),
        (ApplicationAccepted, Bg) => ("Кандидатурата ви е одобрена", "Избрани сте за „{{ task_title }}“. Свържете се с клиента, за да започнете."),
        (ApplicationAccepted, Ru) => ("Ваш отклик принят", "Вас выбрали для задачи «{{ task_title }}». Свяжитесь с заказчиком, чтобы начать."),
        (ApplicationAccepted, Uk) => ("Вашу заявку прийнято", "Вас обрано для завдання «{{ task_title }}». Зв'яжіться із замовником, щоб почати."),

        (ApplicationRejected, En) => ("Application not selected", "The customer did not select your application for \"{{ task_title }}\".{% if reason %} Reason: {{ reason }}{% endif %}"),
        (ApplicationRejected, Bg) => ("Кандидатурата не е избрана", "Клиентът не избра кандидатурата ви за „{{ task_title }}“.{% if reason %} Причина: {{ reason }}{% endif %}"),
        (ApplicationRejected, Ru) => ("Отклик отклонён", "Заказчик не выбрал ваш отклик на «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),
        (ApplicationRejected, Uk) => ("Заявку відхилено", "Замовник не обрав вашу заявку на «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),

        (ApplicationWithdrawn, En) => ("Application withdrawn", "{{ actor_name }} withdrew their application for \"{{ task_title }}\"."),
        (ApplicationWithdrawn, Bg) => ("Кандидатурата е оттеглена", "{{ actor_name }} оттегли кандидатурата си за „{{ task_title }}“."),
        (ApplicationWithdrawn, Ru) => ("Отклик отозван", "{{ actor_name }} отозвал свой отклик на «{{ task_title }}»."),
        (ApplicationWithdrawn, Uk) => ("Заявку відкликано", "{{ actor_name }} відкликав свою заявку на «{{ task_title }}»."),

        (RemovedFromTask, En) => ("Removed from task", "The customer removed you from \"{{ task_title }}\".{% if reason %} Reason: {{ reason }}{% endif %}"),
        (RemovedFromTask, Bg) => ("Премахнати сте от задачата", "Клиентът ви премахна от „{{ task_title }}“.{% if reason %} Причина: {{ reason }}{% endif %}"),
        (RemovedFromTask, Ru) => ("Вы сняты с задачи", "Заказчик снял вас с задачи «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),
        (RemovedFromTask, Uk) => ("Вас знято із завдання", "Замовник зняв вас із завдання «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),

        (TaskCancelled, En) => ("Task cancelled", "\"{{ task_title }}\" was cancelled by the customer."),
        (TaskCancelled, Bg) => ("Задачата е отменена", "„{{ task_title }}“ беше отменена от клиента."),
        (TaskCancelled, Ru) => ("Задача отменена", "Заказчик отменил задачу «{{ task_title }}»."),
        (TaskCancelled, Uk) => ("Завдання скасовано", "Замовник скасував завдання «{{ task_title }}»."),

        (CompletionRequested, En) => ("Please confirm completion", "{{ actor_name }} marked \"{{ task_title }}\" as completed. Please confirm."),
        (CompletionRequested, Bg) => ("Потвърдете завършването", "{{ actor_name }} отбеляза „{{ task_title }}“ като завършена. Моля, потвърдете."),
        (CompletionRequested, Ru) => ("Подтвердите завершение", "{{ actor_name }} отметил задачу «{{ task_title }}» как выполненную. Пожалуйста, подтвердите."),
        (CompletionRequested, Uk) => ("Підтвердіть завершення", "{{ actor_name }} позначив завдання «{{ task_title }}» як виконане. Будь ласка, підтвердіть."),

        (TaskCompleted, En) => ("Task completed", "\"{{ task_title }}\" is complete. Thank you for using Trudify!"),
        (TaskCompleted, Bg) => ("Задачата е завършена", "„{{ task_title }}“ е завършена. Благодарим, че използвате Trudify!"),
        (TaskCompleted, Ru) => ("Задача выполнена", "Задача «{{ task_title }}» выполнена. Спасибо, что пользуетесь Trudify!"),
        (TaskCompleted, Uk) => ("Завдання виконано", "Завдання «{{ task_title }}» виконано. Дякуємо, що користуєтеся Trudify!"),

        (TaskDisputed, En) => ("Task disputed", "{{ actor_name }} opened a dispute on \"{{ task_title }}\".{% if reason %} Reason: {{ reason }}{% endif %}"),
        (TaskDisputed, Bg) => ("Спор по задачата", "{{ actor_name }} откри спор по „{{ task_title }}“.{% if reason %} Причина: {{ reason }}{% endif %}"),
        (TaskDisputed, Ru) => ("Спор по задаче", "{{ actor_name }} открыл спор по задаче «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),
        (TaskDisputed, Uk) => ("Спір щодо завдання", "{{ actor_name }} відкрив спір щодо завдання «{{ task_title }}».{% if reason %} Причина: {{ reason }}{% endif %}"),

        (ReviewReceived, En) => ("New review", "{{ actor_name }} rated your work on \"{{ task_title }}\" {{ rating }}/5."),
        (ReviewReceived, Bg) => ("Нов отзив", "{{ actor_name }} оцени работата ви по „{{ task_title }}“ с {{ rating }}/5."),
        (ReviewReceived, Ru) => ("Новый отзыв", "{{ actor_name }} оценил вашу работу по задаче «{{ task_title }}» на {{ rating }}/5."),
        (ReviewReceived, Uk) => ("Новий відгук", "{{ actor_name }} оцінив вашу роботу над завданням «{{ task_title }}» на {{ rating }}/5."),

        (QuestionAsked, En) => ("New question", "{{ actor_name }} asked about \"{{ task_title }}\": {{ question }}"),
        (QuestionAsked, Bg) => ("Нов въпрос", "{{ actor_name }} попита за „{{ task_title }}“: {{ question }}"),
        (QuestionAsked, Ru) => ("Новый вопрос", "{{ actor_name }} спросил о задаче «{{ task_title }}»: {{ question }}"),
        (QuestionAsked, Uk) => ("Нове запитання", "{{ actor_name }} запитав про завдання «{{ task_title }}»: {{ question }}"),

        (QuestionAnswered, En) => ("Your question was answered", "The customer answered your question about \"{{ task_title }}\"."),
        (QuestionAnswered, Bg) => ("Отговор на въпроса ви", "Клиентът отговори на въпроса ви за „{{ task_title }}“."),
        (QuestionAnswered, Ru) => ("На ваш вопрос ответили", "Заказчик ответил на ваш вопрос о задаче «{{ task_title }}»."),
        (QuestionAnswered, Uk) => ("На ваше запитання відповіли", "Замовник відповів на ваше запитання щодо завдання «{{ task_title }}»."),
    }
}

fn render_str(env: &Environment<'_>, template: &str, context: &JsonValue) -> String {
    env.render_str(template, context).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "notification template failed to render");
        template.to_string()
    })
}

pub fn render(locale: Locale, kind: NotificationKind, context: &JsonValue) -> RenderedMessage {
    let env = Environment::new();
    let (title, body) = source(locale, kind);
    RenderedMessage {
        title: render_str(&env, title, context),
        body: render_str(&env, body, context),
    }
}

const EMAIL_LAYOUT: &str = r#"<!doctype html>
<html>
  <body style="font-family: Arial, sans-serif; color: #1f2937;">
    <h2>{{ title }}</h2>
    <p>{{ body }}</p>
    {% if action_url %}<p><a href="{{ action_url }}">{{ cta }}</a></p>{% endif %}
    <p style="color: #6b7280; font-size: 12px;">Trudify</p>
  </body>
</html>"#;

fn call_to_action(locale: Locale) -> &'static str {
    match locale {
        Locale::Bg => "Отвори в Trudify",
        Locale::En => "Open in Trudify",
        Locale::Ru => "Открыть в Trudify",
        Locale::Uk => "Відкрити в Trudify",
    }
}

/// Wraps a rendered message in the HTML email layout. Values are HTML-escaped.
pub fn render_email_html(
    locale: Locale,
    message: &RenderedMessage,
    action_url: Option<&str>,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("notification.html", EMAIL_LAYOUT)?;
    env.get_template("notification.html")?.render(minijinja::context! {
        title => message.title,
        body => message.body,
        action_url => action_url,
        cta => call_to_action(locale),
    })
}

/// Bot replies that are not tied to a stored notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotText {
    Linked,
    LinkInvalid,
    Help,
}

pub fn bot_text(locale: Locale, text: BotText) -> &'static str {
    use BotText::*;
    use Locale::*;

    match (text, locale) {
        (Linked, En) => "Your Telegram account is now linked to Trudify. Notifications will arrive here.",
        (Linked, Bg) => "Telegram акаунтът ви е свързан с Trudify. Известията ще пристигат тук.",
        (Linked, Ru) => "Ваш Telegram-аккаунт привязан к Trudify. Уведомления будут приходить сюда.",
        (Linked, Uk) => "Ваш Telegram-акаунт прив'язано до Trudify. Сповіщення надходитимуть сюди.",

        (LinkInvalid, En) => "This link has expired. Please generate a new one from your Trudify profile.",
        (LinkInvalid, Bg) => "Връзката е изтекла. Моля, генерирайте нова от профила си в Trudify.",
        (LinkInvalid, Ru) => "Срок действия ссылки истёк. Создайте новую в профиле Trudify.",
        (LinkInvalid, Uk) => "Термін дії посилання минув. Створіть нове у профілі Trudify.",

        (Help, En) => "To receive notifications, open your Trudify profile and press \"Connect Telegram\".",
        (Help, Bg) => "За да получавате известия, отворете профила си в Trudify и натиснете „Свържи Telegram“.",
        (Help, Ru) => "Чтобы получать уведомления, откройте профиль Trudify и нажмите «Подключить Telegram».",
        (Help, Uk) => "Щоб отримувати сповіщення, відкрийте профіль Trudify і натисніть «Підключити Telegram».",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_context_into_locale_template() {
        let msg = render(
            Locale::En,
            NotificationKind::ApplicationReceived,
            &json!({ "actor_name": "Maria", "task_title": "Fix sink", "price": "80.00" }),
        );
        assert_eq!(msg.title, "New application");
        assert_eq!(msg.body, "Maria applied to \"Fix sink\" offering 80.00 BGN.");
    }

    #[test]
    fn optional_reason_is_omitted_when_missing() {
        let without = render(
            Locale::Bg,
            NotificationKind::ApplicationRejected,
            &json!({ "task_title": "Боядисване" }),
        );
        assert!(!without.body.contains("Причина"));

        let with = render(
            Locale::Bg,
            NotificationKind::ApplicationRejected,
            &json!({ "task_title": "Боядисване", "reason": "друга цена" }),
        );
        assert!(with.body.ends_with("Причина: друга цена"));
    }

    #[test]
    fn email_layout_escapes_user_content() {
        let msg = RenderedMessage {
            title: "New question".into(),
            body: "<script>alert(1)</script>".into(),
        };
        let html = render_email_html(Locale::En, &msg, Some("https://trudify.com/en/tasks/1")).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Open in Trudify"));
    }

    #[test]
    fn every_locale_has_bot_texts() {
        for locale in Locale::ALL {
            for text in [BotText::Linked, BotText::LinkInvalid, BotText::Help] {
                assert!(!bot_text(locale, text).is_empty());
            }
        }
    }
}
