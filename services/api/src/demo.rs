use crate::infra::LogDispatcher;
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use student_housing::config::SeedAdminConfig;
use student_housing::error::AppError;
use student_housing::workflows::accommodations::AccommodationDraft;
use student_housing::workflows::accounts::{Actor, NewAccount, Registration, Role, UserView};
use student_housing::workflows::applications::{ApplicationRequest, ApprovalTerms};
use student_housing::workflows::dashboard::Dashboard;
use student_housing::workflows::invoices::Payment;
use student_housing::workflows::maintenance::{
    MaintenanceStatus, MaintenanceSubmission, Priority, StatusUpdate,
};
use student_housing::workflows::notifications::{Audience, BroadcastRequest};
use student_housing::workflows::{InMemoryHousingStore, Portal, PortalSettings, WorkflowError};

const DEMO_PASSWORD: &str = "demo-pass";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Requested move-in date (YYYY-MM-DD). Defaults to two weeks from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) move_in: Option<NaiveDate>,
    /// Rooms offered by the demo accommodation.
    #[arg(long, default_value_t = 4)]
    pub(crate) rooms: u32,
    /// Stop after signing, leaving the first invoice unpaid.
    #[arg(long)]
    pub(crate) skip_payment: bool,
    /// Skip the maintenance and broadcast portion of the demo.
    #[arg(long)]
    pub(crate) skip_maintenance: bool,
}

type DemoPortal = Portal<InMemoryHousingStore, LogDispatcher>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let move_in = args
        .move_in
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(14));

    let mut settings = PortalSettings::default();
    settings.messaging.sms_enabled = true;
    let portal = Portal::new(
        Arc::new(InMemoryHousingStore::new()),
        Arc::new(LogDispatcher),
        settings,
    );

    let master = portal
        .accounts()
        .ensure_master_admin(&SeedAdminConfig {
            username: "admin".to_string(),
            email: "admin@harambee.com".to_string(),
            password: DEMO_PASSWORD.to_string(),
        })?
        .ok_or_else(|| WorkflowError::conflict("Demo store was not empty"))?;
    let master = actor(&master);

    let warden = actor(&portal.accounts().create_user(
        master,
        NewAccount {
            role: Role::Admin,
            registration: registration("warden", "Lerato", "Dlamini", None),
        },
    )?);
    let student = actor(&portal.accounts().register(registration(
        "thandi",
        "Thandi",
        "Mokoena",
        Some("0825550101"),
    ))?);

    let lodge = portal.accommodations().create(
        warden,
        AccommodationDraft {
            name: "Varsity Lodge".to_string(),
            location: "12 Jan Smuts Ave, Braamfontein".to_string(),
            description: "Furnished single rooms a short walk from campus".to_string(),
            rooms_available: args.rooms,
            price_per_month: Decimal::new(4500, 0),
            admin_id: None,
        },
    )?;
    let lodge_id = lodge.accommodation.id;

    println!("Harambee Student Living: portal walkthrough");
    println!("==========================================");
    println!(
        "Listing: {} ({}), {} rooms at R{}/month",
        lodge.accommodation.name,
        lodge.accommodation.location,
        lodge.accommodation.rooms_available,
        lodge.accommodation.price_per_month
    );

    let application = portal.applications().submit(
        student,
        ApplicationRequest {
            accommodation_id: lodge_id,
            move_in_date: Some(move_in),
            notes: Some("Second-year engineering student".to_string()),
        },
    )?;
    println!(
        "\nApplication #{} submitted for move-in on {} ({})",
        application.id,
        move_in,
        application.status.label()
    );

    let approval = portal
        .applications()
        .approve(warden, application.id, ApprovalTerms::default())?;
    let lease = approval.lease;
    println!(
        "Approved by warden: lease #{} from {} to {}, rent R{}, deposit R{}",
        lease.id, lease.start_date, lease.end_date, lease.monthly_rent, lease.security_deposit
    );

    let signing = portal.leases().sign(student, lease.id)?;
    let invoice = signing.invoice;
    println!(
        "Lease signed ({}). First invoice {}: R{} due {} [{:?}]",
        signing.lease.status.label(),
        invoice.number,
        invoice.total,
        invoice.invoice.due_date,
        invoice.status
    );

    if args.skip_payment {
        println!("Payment skipped; invoice remains outstanding.");
    } else {
        let paid = portal.invoices().mark_paid(
            warden,
            invoice.invoice.id,
            Payment {
                payment_method: "EFT".to_string(),
                reference_number: Some("THANDI-001".to_string()),
            },
        )?;
        println!(
            "Payment recorded via {} ({:?})",
            paid.invoice.payment_method.as_deref().unwrap_or("unknown"),
            paid.status
        );
    }

    if !args.skip_maintenance {
        let request = portal.maintenance().submit(
            student,
            MaintenanceSubmission {
                accommodation_id: lodge_id,
                issue: "Leaking tap".to_string(),
                description: "Bathroom basin tap drips constantly".to_string(),
                priority: Priority::Medium,
            },
        )?;
        let request = portal.maintenance().update_status(
            warden,
            request.id,
            StatusUpdate {
                status: MaintenanceStatus::InProgress,
                notes: Some("Plumber booked for Thursday".to_string()),
            },
        )?;
        println!(
            "\nMaintenance #{} '{}' is {}",
            request.id,
            request.issue,
            request.status.label()
        );

        let report = portal.notifications().broadcast(
            warden,
            BroadcastRequest {
                subject: "Water shutdown".to_string(),
                message: "Water will be off on Saturday from 08:00 to 12:00.".to_string(),
                audience: Audience::Accommodation {
                    accommodation_id: lodge_id,
                },
                send_sms: true,
            },
        )?;
        println!(
            "Broadcast reached {} resident(s): {} email(s), {} sms",
            report.recipients, report.emails_sent, report.sms_sent
        );
    }

    println!("\nDashboards");
    println!("----------");
    render_dashboard("thandi", &portal_summary(&portal, student)?);
    render_dashboard("warden", &portal_summary(&portal, warden)?);

    Ok(())
}

fn portal_summary(portal: &DemoPortal, actor: Actor) -> Result<Dashboard, WorkflowError> {
    portal.dashboard().summary(actor)
}

fn render_dashboard(username: &str, dashboard: &Dashboard) {
    match dashboard {
        Dashboard::Student(view) => {
            println!(
                "{username}: {} approved application(s), lease {}, R{} due ({} unpaid), \
                 {} open maintenance, {} unread",
                view.applications.approved,
                view.current_lease
                    .as_ref()
                    .map_or("none", |lease| lease.status.label()),
                view.amount_due,
                view.unpaid_invoices,
                view.open_maintenance,
                view.unread_notifications
            );
        }
        Dashboard::Admin(view) => {
            println!(
                "{username}: {}/{} rooms occupied across {} listing(s), \
                 {} pending application(s), R{} outstanding, {} open maintenance",
                view.occupied_rooms,
                view.total_rooms,
                view.accommodations,
                view.pending_applications,
                view.outstanding,
                view.open_maintenance
            );
        }
    }
}

fn actor(user: &UserView) -> Actor {
    Actor::new(user.id, user.role)
}

fn registration(
    username: &str,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
) -> Registration {
    Registration {
        username: username.to_string(),
        email: format!("{username}@students.harambee.com"),
        password: DEMO_PASSWORD.to_string(),
        confirm_password: DEMO_PASSWORD.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone: phone.map(str::to_string),
    }
}
