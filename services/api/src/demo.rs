use chrono::Duration;
use clap::Args;
use internship_tracker::applications::{
    Application, ApplicationDraft, ApplicationService, ApplicationStatus, EventSchedule,
    FieldUpdate, InMemoryApplicationRepository, ListRequest, NOT_PROVIDED,
};
use internship_tracker::auth::{
    Authenticator, Credentials, InMemoryAuthenticator, Registration, MIN_PASSWORD_COST,
};
use internship_tracker::clock::Clock;
use internship_tracker::config::TrackerConfig;
use internship_tracker::error::AppError;
use std::sync::Arc;

use crate::infra::system_clock;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Company substring used for the filtered listing
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Page size for the listing portion of the demo
    #[arg(long, default_value_t = 10)]
    pub(crate) page_size: u32,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { search, page_size } = args;
    let settings = TrackerConfig::default();
    let clock = system_clock();
    // Demo accounts never outlive the process.
    let authenticator = InMemoryAuthenticator::new(Arc::clone(&clock), Duration::hours(24))
        .with_password_cost(MIN_PASSWORD_COST);
    let service = ApplicationService::new(
        Arc::new(InMemoryApplicationRepository::new()),
        Arc::clone(&clock),
    );

    println!("Internship tracker demo (in-memory store)");
    let profile = authenticator.register(Registration {
        username: "demo".to_string(),
        email: "demo@example.com".to_string(),
        password: "demo-password".to_string(),
        ..Registration::default()
    })?;
    let session = authenticator.login(Credentials {
        email: profile.email.clone(),
        password: "demo-password".to_string(),
    })?;
    let owner = authenticator.authorize(&session.token)?;
    println!(
        "- Registered {} (user {}) | session valid until {}",
        profile.username, owner, session.expires_at
    );

    let acme = service.create(
        owner,
        ApplicationDraft {
            company: "Acme Robotics".to_string(),
            position: "Firmware Intern".to_string(),
            location: Some("Berlin".to_string()),
            notes: Some("Referred by a former teammate".to_string()),
            ..ApplicationDraft::default()
        },
    )?;
    let globex = service.create(
        owner,
        ApplicationDraft {
            company: "Globex".to_string(),
            position: "Data Platform Intern".to_string(),
            salary: Some("3200/month".to_string()),
            ..ApplicationDraft::default()
        },
    )?;
    let initech = service.create(
        owner,
        ApplicationDraft {
            company: "Initech".to_string(),
            position: "QA Intern".to_string(),
            ..ApplicationDraft::default()
        },
    )?;
    println!("- Tracked 3 applications");

    service.set_status(acme.id, ApplicationStatus::Interview)?;
    service.set_status(globex.id, ApplicationStatus::Written)?;
    service.set_status(initech.id, ApplicationStatus::Rejected)?;
    service.schedule_event(
        acme.id,
        EventSchedule {
            next_event: Some(clock.now() + Duration::days(2)),
            event_type: Some("onsite interview".to_string()),
            event_link: Some("https://meet.example.com/acme".to_string()),
        },
    )?;
    service.schedule_event(
        globex.id,
        EventSchedule {
            next_event: Some(clock.now() - Duration::days(1)),
            event_type: Some("written test".to_string()),
            event_link: None,
        },
    )?;
    service.update_fields(
        globex.id,
        owner,
        FieldUpdate {
            company: "Globex Corporation".to_string(),
            position: "Data Platform Intern".to_string(),
            salary: Some("3400/month".to_string()),
            notes: Some("Asked for a take-home extension".to_string()),
            ..FieldUpdate::default()
        },
    )?;

    let mut request = ListRequest::page(1, page_size);
    if let Some(search) = search.as_deref() {
        request = request.with_search(search);
    }
    let page = service.list(owner, request)?;
    println!(
        "\nListing (page {} of size {}, {} matching)",
        page.current_page, page.page_size, page.total
    );
    for application in &page.applications {
        print_application(application);
    }

    let recent = service.recent(owner, settings.recent_limit)?;
    println!("\nRecent activity (rejected hidden):");
    for summary in &recent {
        println!(
            "  - {} / {} [{}]",
            summary.company, summary.position, summary.status
        );
    }

    let upcoming = service.upcoming_events(owner)?;
    println!("\nUpcoming events:");
    if upcoming.is_empty() {
        println!("  none scheduled");
    }
    for application in &upcoming {
        println!(
            "  - {} on {} ({})",
            application.company,
            application
                .next_event
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            application.event_type.as_deref().unwrap_or("event")
        );
    }

    let statistics = service.statistics(owner)?;
    match serde_json::to_string_pretty(&statistics) {
        Ok(json) => println!("\nStatus statistics:\n{}", json),
        Err(err) => println!("\nStatus statistics unavailable: {}", err),
    }

    service.delete(initech.id, owner)?;
    let remaining = service.list(owner, ListRequest::page(1, page_size))?;
    println!(
        "\nDeleted {} -> {} applications remain",
        initech.company, remaining.total
    );

    Ok(())
}

fn print_application(application: &Application) {
    println!(
        "  - #{} {} / {} [{}] location={} salary={}",
        application.id,
        application.company,
        application.position,
        application.status,
        application.location,
        application.salary
    );
    if application.notes != NOT_PROVIDED {
        println!("    notes: {}", application.notes);
    }
}
